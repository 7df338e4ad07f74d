//! Per-role decision records submitted each round.
//!
//! Shapes are validated upstream by the schema layer; the engine assumes
//! well-typed decisions and treats an absent role as status quo. Every
//! record's `Default` is the explicit "do nothing" choice.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Strategy,
    Marketing,
    Sales,
    Operations,
    Research,
    Legal,
    GeneralManagement,
}

impl Role {
    /// Fixed application order of the decision pipeline. Later roles observe
    /// earlier roles' updates within the same round; this ordering is a
    /// documented contract, not an implementation detail.
    pub const PIPELINE_ORDER: [Role; 7] = [
        Role::Strategy,
        Role::Marketing,
        Role::Sales,
        Role::Operations,
        Role::Research,
        Role::Legal,
        Role::GeneralManagement,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strategy => "strategy",
            Self::Marketing => "marketing",
            Self::Sales => "sales",
            Self::Operations => "operations",
            Self::Research => "research",
            Self::Legal => "legal",
            Self::GeneralManagement => "general_management",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyPosture {
    #[default]
    Hold,
    Expand,
    Focus,
    Pivot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StrategyDecision {
    pub posture: StrategyPosture,
    /// M$ committed to the chosen posture this quarter.
    #[serde(default)]
    pub expansion_spend: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CampaignIntensity {
    #[default]
    Maintain,
    Targeted,
    Aggressive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MarketingDecision {
    pub campaign: CampaignIntensity,
    #[serde(default)]
    pub spend: f64,
    #[serde(default)]
    pub brand_push: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SalesMotion {
    #[default]
    Steady,
    Enterprise,
    Velocity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SalesDecision {
    pub motion: SalesMotion,
    /// Net sales hires this quarter; negative values model attrition-led
    /// shrink.
    #[serde(default)]
    pub hiring: f64,
    #[serde(default)]
    pub discounting: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OpsFocus {
    #[default]
    Maintain,
    Efficiency,
    Capacity,
    Resilience,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OperationsDecision {
    pub focus: OpsFocus,
    #[serde(default)]
    pub automation_spend: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResearchDirection {
    #[default]
    Sustain,
    NewProduct,
    DebtPaydown,
    QualityHardening,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResearchDecision {
    pub direction: ResearchDirection,
    #[serde(default)]
    pub spend: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LegalStance {
    #[default]
    Monitor,
    Reinforce,
    Aggressive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LegalDecision {
    pub stance: LegalStance,
    #[serde(default)]
    pub compliance_invest: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GmPriority {
    #[default]
    SteadyHand,
    CostControl,
    GrowthPush,
    MoraleRescue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GeneralManagementDecision {
    pub priority: GmPriority,
    #[serde(default)]
    pub culture_invest: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RoleDecision {
    Strategy(StrategyDecision),
    Marketing(MarketingDecision),
    Sales(SalesDecision),
    Operations(OperationsDecision),
    Research(ResearchDecision),
    Legal(LegalDecision),
    GeneralManagement(GeneralManagementDecision),
}

impl RoleDecision {
    pub fn role(&self) -> Role {
        match self {
            Self::Strategy(_) => Role::Strategy,
            Self::Marketing(_) => Role::Marketing,
            Self::Sales(_) => Role::Sales,
            Self::Operations(_) => Role::Operations,
            Self::Research(_) => Role::Research,
            Self::Legal(_) => Role::Legal,
            Self::GeneralManagement(_) => Role::GeneralManagement,
        }
    }

    /// The status-quo decision substituted for a role that did not submit.
    pub fn default_for(role: Role) -> Self {
        match role {
            Role::Strategy => Self::Strategy(StrategyDecision::default()),
            Role::Marketing => Self::Marketing(MarketingDecision::default()),
            Role::Sales => Self::Sales(SalesDecision::default()),
            Role::Operations => Self::Operations(OperationsDecision::default()),
            Role::Research => Self::Research(ResearchDecision::default()),
            Role::Legal => Self::Legal(LegalDecision::default()),
            Role::GeneralManagement => {
                Self::GeneralManagement(GeneralManagementDecision::default())
            }
        }
    }
}

/// Whether the round history holds a submission or the engine's default
/// fill-in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOrigin {
    Submitted,
    Defaulted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordedDecision {
    pub role: Role,
    pub origin: DecisionOrigin,
    pub decision: RoleDecision,
}

/// The decisions accumulated for one round. Absent roles are defaulted by
/// the reducer, never treated as errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RoundDecisions {
    pub by_role: std::collections::BTreeMap<Role, RoleDecision>,
}

impl RoundDecisions {
    pub fn submit(&mut self, decision: RoleDecision) {
        self.by_role.insert(decision.role(), decision);
    }

    pub fn is_submitted(&self, role: Role) -> bool {
        self.by_role.contains_key(&role)
    }
}
