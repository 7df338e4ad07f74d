//! v1 cross-boundary contracts for the simulation engine, API, persistence,
//! and presentation clients.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod decisions;

pub use decisions::{
    CampaignIntensity, DecisionOrigin, GeneralManagementDecision, GmPriority, LegalDecision,
    LegalStance, MarketingDecision, OperationsDecision, OpsFocus, RecordedDecision, ResearchDecision,
    ResearchDirection, Role, RoleDecision, RoundDecisions, SalesDecision, SalesMotion,
    StrategyDecision, StrategyPosture,
};

pub const SCHEMA_VERSION_V1: &str = "1.0";

/// Company-internal metrics. Monetary fields are quarterly figures in M$.
///
/// Documented ranges, enforced by the engine after every round:
/// cash [-1000, 100000], revenue/costs/sales_pipeline [0, 10000],
/// runway_months [0, 120], headcount [1, 100000], all percentage-style
/// fields [0, 100]. `profit` is always `revenue - costs`, never set
/// independently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyState {
    pub cash: f64,
    pub revenue: f64,
    pub costs: f64,
    pub profit: f64,
    pub runway_months: f64,
    pub headcount: f64,
    pub morale: f64,
    pub tech_debt: f64,
    pub product_quality: f64,
    pub brand_trust: f64,
    pub compliance_posture: f64,
    pub sales_pipeline: f64,
    pub churn_rate: f64,
}

/// External environment indices. demand_index and price_index run [0, 200]
/// with 100 as the baseline; everything else runs [0, 100] with sentiment
/// neutral at 50.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketState {
    pub demand_index: f64,
    pub price_index: f64,
    pub competition_intensity: f64,
    pub regulation_scrutiny: f64,
    pub channel_friction: f64,
    pub supply_shock_risk: f64,
    pub sentiment: f64,
}

/// Percentage exposures, each [0, 100].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskProfile {
    pub operational: f64,
    pub regulatory: f64,
    pub reputational: f64,
    pub financial: f64,
}

impl RiskProfile {
    pub fn mean(&self) -> f64 {
        (self.operational + self.regulatory + self.reputational + self.financial) / 4.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PriceWar,
    RegulatorInquiry,
    KeyStaffExit,
    SupplyShock,
    ViralMoment,
    SecurityBreach,
    EconomicDownturn,
    TalentSurge,
}

impl EventType {
    pub const ALL: [EventType; 8] = [
        EventType::PriceWar,
        EventType::RegulatorInquiry,
        EventType::KeyStaffExit,
        EventType::SupplyShock,
        EventType::ViralMoment,
        EventType::SecurityBreach,
        EventType::EconomicDownturn,
        EventType::TalentSurge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PriceWar => "price_war",
            Self::RegulatorInquiry => "regulator_inquiry",
            Self::KeyStaffExit => "key_staff_exit",
            Self::SupplyShock => "supply_shock",
            Self::ViralMoment => "viral_moment",
            Self::SecurityBreach => "security_breach",
            Self::EconomicDownturn => "economic_downturn",
            Self::TalentSurge => "talent_surge",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Effect magnitudes are authored at high severity and scaled down.
    pub fn magnitude_scale(self) -> f64 {
        match self {
            Self::High => 1.0,
            Self::Medium => 0.6,
            Self::Low => 0.35,
        }
    }
}

/// One typed additive delta against a company/market/risk field, addressed
/// by string path (e.g. "company.cash", "risk.regulatory"). Unrecognized
/// targets are ignored by the engine so configs can evolve ahead of code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectDelta {
    pub target: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub schema_version: String,
    pub event_id: String,
    pub run_id: String,
    pub team_id: String,
    pub round: u32,
    pub event_type: EventType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub effects: Vec<EffectDelta>,
    /// True when a facilitator forced the event past the probability test.
    #[serde(default)]
    pub forced: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeCategory {
    Decision,
    Event,
    Outcome,
    Warning,
    Achievement,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeImpact {
    Positive,
    Neutral,
    Negative,
}

/// Structured round log entry. The category/impact/metrics shape is the
/// durable contract consumed by reporting; the prose may vary freely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NarrativeEntry {
    pub round: u32,
    pub category: NarrativeCategory,
    pub title: String,
    pub description: String,
    pub impact: NarrativeImpact,
    pub metrics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scorecard {
    pub financial_health: f64,
    pub growth: f64,
    pub trust: f64,
    pub resilience: f64,
    pub execution: f64,
    pub total: f64,
    pub board_confidence: String,
    pub regulatory_heat: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    DecisionsOpen,
    DecisionsLocked,
    Complete,
}

/// Per-round record of what each role actually did, including whether the
/// decision was submitted or defaulted, so facilitators can grade
/// non-response separately from deliberate status quo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundDecisionRecord {
    pub round: u32,
    pub decisions: Vec<RecordedDecision>,
}

/// One team's full playthrough state. Owned exclusively by its team and
/// mutated only by the round reducer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameState {
    pub schema_version: String,
    pub run_id: String,
    pub team_id: String,
    pub scenario_key: String,
    #[serde(with = "serde_u64_string")]
    pub seed: u64,
    pub round: u32,
    pub max_rounds: u32,
    pub phase: GamePhase,
    pub company: CompanyState,
    pub market: MarketState,
    pub risk: RiskProfile,
    pub scorecard: Scorecard,
    pub decision_history: Vec<RoundDecisionRecord>,
    pub event_history: Vec<Event>,
    pub narrative_history: Vec<NarrativeEntry>,
}

impl GameState {
    /// A run is done once its phase says so or its counter has reached the
    /// scenario bound; advancing a complete state is always a no-op.
    pub fn is_complete(&self) -> bool {
        self.phase == GamePhase::Complete || self.round >= self.max_rounds
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    pub schema_version: String,
    pub key: String,
    pub name: String,
    pub max_rounds: u32,
    /// Multiplies every event trigger probability before the 0.5 cap.
    pub difficulty: f64,
    pub initial_company: CompanyState,
    pub initial_market: MarketState,
    pub initial_risk: RiskProfile,
    pub event_base_rates: BTreeMap<EventType, f64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let mut event_base_rates = BTreeMap::new();
        event_base_rates.insert(EventType::PriceWar, 0.12);
        event_base_rates.insert(EventType::RegulatorInquiry, 0.10);
        event_base_rates.insert(EventType::KeyStaffExit, 0.10);
        event_base_rates.insert(EventType::SupplyShock, 0.08);
        event_base_rates.insert(EventType::ViralMoment, 0.08);
        event_base_rates.insert(EventType::SecurityBreach, 0.08);
        event_base_rates.insert(EventType::EconomicDownturn, 0.06);
        event_base_rates.insert(EventType::TalentSurge, 0.08);

        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            key: "scaleup_default".to_string(),
            name: "Series B Scale-Up".to_string(),
            max_rounds: 8,
            difficulty: 1.0,
            initial_company: CompanyState {
                cash: 50.0,
                revenue: 5.0,
                costs: 4.0,
                profit: 1.0,
                runway_months: 120.0,
                headcount: 40.0,
                morale: 62.0,
                tech_debt: 20.0,
                product_quality: 60.0,
                brand_trust: 65.0,
                compliance_posture: 60.0,
                sales_pipeline: 160.0,
                churn_rate: 4.0,
            },
            initial_market: MarketState {
                demand_index: 100.0,
                price_index: 100.0,
                competition_intensity: 55.0,
                regulation_scrutiny: 45.0,
                channel_friction: 40.0,
                supply_shock_risk: 30.0,
                sentiment: 55.0,
            },
            initial_risk: RiskProfile {
                operational: 30.0,
                regulatory: 35.0,
                reputational: 25.0,
                financial: 30.0,
            },
            event_base_rates,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Lobby,
    Running,
    Paused,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunStatus {
    pub schema_version: String,
    pub run_id: String,
    pub scenario_key: String,
    #[serde(with = "serde_u64_string")]
    pub seed: u64,
    pub phase: RunPhase,
    pub team_count: usize,
    pub max_rounds: u32,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={} scenario={} phase={:?} teams={}",
            self.run_id, self.scenario_key, self.phase, self.team_count
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamSummary {
    pub team_id: String,
    pub name: String,
    pub round: u32,
    pub phase: GamePhase,
    pub total_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub team_id: String,
    pub name: String,
    pub round: u32,
    pub scorecard: Scorecard,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    RunStart,
    RunPause,
    RunResume,
    AddTeam,
    RemoveTeam,
    SubmitDecision,
    AdvanceTeam,
    AdvanceAll,
    InjectEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandPayload {
    RunStart,
    RunPause,
    RunResume,
    AddTeam {
        team_id: String,
        name: String,
    },
    RemoveTeam {
        team_id: String,
    },
    SubmitDecision {
        team_id: String,
        role: Role,
        decision: RoleDecision,
    },
    AdvanceTeam {
        team_id: String,
    },
    AdvanceAll,
    InjectEvent {
        team_id: String,
        event_type: EventType,
        severity: Severity,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Command {
    pub schema_version: String,
    pub command_id: String,
    pub run_id: String,
    pub command_type: CommandType,
    pub payload: CommandPayload,
}

impl Command {
    pub fn new(
        command_id: impl Into<String>,
        run_id: impl Into<String>,
        command_type: CommandType,
        payload: CommandPayload,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            command_id: command_id.into(),
            run_id: run_id.into(),
            command_type,
            payload,
        }
    }
}

/// Envelope for read-only API queries. `data` stays schemaless so query
/// shapes can evolve without a contract bump.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    pub schema_version: String,
    pub query_type: String,
    pub run_id: String,
    pub generated_at_round: u32,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RunNotFound,
    TeamNotFound,
    InvalidCommand,
    InvalidQuery,
    DecisionsLocked,
    RunStateConflict,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub schema_version: String,
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            error_code,
            message: message.into(),
            details,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandResult {
    pub schema_version: String,
    pub command_id: String,
    pub run_id: String,
    pub accepted: bool,
    pub error: Option<ApiError>,
}

impl CommandResult {
    pub fn accepted(command: &Command) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            command_id: command.command_id.clone(),
            run_id: command.run_id.clone(),
            accepted: true,
            error: None,
        }
    }

    pub fn rejected(command: &Command, error: ApiError) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            command_id: command.command_id.clone(),
            run_id: command.run_id.clone(),
            accepted: false,
            error: Some(error),
        }
    }
}

/// Facilitator-forced event as recorded for replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForcedEventRecord {
    pub round: u32,
    pub event_type: EventType,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamExport {
    pub team_id: String,
    pub name: String,
    pub rounds_played: u32,
    pub decision_history: Vec<RoundDecisionRecord>,
    pub forced_events: Vec<ForcedEventRecord>,
}

/// Everything needed to reconstruct a run exactly: the scenario, the seed,
/// and each team's full decision/injection history. Importing replays every
/// round through the reducer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunExport {
    pub schema_version: String,
    pub run_id: String,
    #[serde(with = "serde_u64_string")]
    pub seed: u64,
    pub scenario: ScenarioConfig,
    pub phase: RunPhase,
    pub teams: Vec<TeamExport>,
}

pub mod serde_u64_string {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u64>().map_err(D::Error::custom)
    }
}
