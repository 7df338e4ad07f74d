//! Multi-team run orchestration and replay.
//!
//! One `RunManager` owns every team's `GameState` for a run. All teams
//! share the run seed, so their per-round candidate-event shuffle order is
//! identical; they diverge only through their decisions and injections.
//! Export captures the scenario, seed, and per-team decision/injection
//! history, which is exactly enough to reconstruct the run by replaying
//! every round through the reducer.

use std::collections::BTreeMap;
use std::fmt;

use contracts::{
    DecisionOrigin, EventType, ForcedEventRecord, GamePhase, GameState, LeaderboardEntry,
    RoleDecision, RoundDecisions, RunExport, RunPhase, RunStatus, ScenarioConfig, Severity,
    TeamExport, TeamSummary, SCHEMA_VERSION_V1,
};

use crate::reducer::{self, RoundOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    TeamNotFound(String),
    DuplicateTeam(String),
    DecisionsLocked { team_id: String, round: u32 },
    StateConflict { expected: &'static str, actual: RunPhase },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TeamNotFound(team_id) => write!(f, "team not found: {team_id}"),
            Self::DuplicateTeam(team_id) => write!(f, "team already registered: {team_id}"),
            Self::DecisionsLocked { team_id, round } => {
                write!(f, "decisions locked for team {team_id} in round {round}")
            }
            Self::StateConflict { expected, actual } => {
                write!(f, "run must be {expected}, but is {actual:?}")
            }
        }
    }
}

impl std::error::Error for RunError {}

#[derive(Debug)]
pub enum ReplayError {
    SchemaVersion { found: String },
    Run(RunError),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaVersion { found } => {
                write!(
                    f,
                    "unsupported replay schema version {found} (expected {SCHEMA_VERSION_V1})"
                )
            }
            Self::Run(err) => write!(f, "replay failed: {err}"),
        }
    }
}

impl std::error::Error for ReplayError {}

impl From<RunError> for ReplayError {
    fn from(err: RunError) -> Self {
        Self::Run(err)
    }
}

#[derive(Debug, Clone)]
pub struct RunSetup {
    pub run_id: String,
    pub seed: u64,
    pub scenario: ScenarioConfig,
}

#[derive(Debug, Clone)]
struct TeamSlot {
    name: String,
    state: GameState,
    /// Decisions accumulated for the current round, consumed on advance.
    pending: RoundDecisions,
    /// Injections queued for the next advancement.
    queued_injections: Vec<ForcedEventRecord>,
    /// Every injection that has been applied, with the round it hit.
    injection_log: Vec<ForcedEventRecord>,
}

#[derive(Debug, Clone)]
pub struct RunManager {
    run_id: String,
    seed: u64,
    scenario: ScenarioConfig,
    phase: RunPhase,
    teams: BTreeMap<String, TeamSlot>,
}

impl RunManager {
    pub fn new(setup: RunSetup) -> Self {
        Self {
            run_id: setup.run_id,
            seed: setup.seed,
            scenario: setup.scenario,
            phase: RunPhase::Lobby,
            teams: BTreeMap::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn status(&self) -> RunStatus {
        RunStatus {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: self.run_id.clone(),
            scenario_key: self.scenario.key.clone(),
            seed: self.seed,
            phase: self.phase,
            team_count: self.teams.len(),
            max_rounds: self.scenario.max_rounds,
        }
    }

    /// Registers a team at the scenario's initial state. Allowed until the
    /// run completes, so late joiners can enter mid-run at round 1.
    pub fn add_team(
        &mut self,
        team_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<(), RunError> {
        if self.phase == RunPhase::Complete {
            return Err(RunError::StateConflict {
                expected: "not complete",
                actual: self.phase,
            });
        }
        let team_id = team_id.into();
        if self.teams.contains_key(&team_id) {
            return Err(RunError::DuplicateTeam(team_id));
        }
        let state = reducer::new_team_state(&self.run_id, &team_id, &self.scenario, self.seed);
        self.teams.insert(
            team_id,
            TeamSlot {
                name: name.into(),
                state,
                pending: RoundDecisions::default(),
                queued_injections: Vec::new(),
                injection_log: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn remove_team(&mut self, team_id: &str) -> Result<(), RunError> {
        self.teams
            .remove(team_id)
            .map(|_| ())
            .ok_or_else(|| RunError::TeamNotFound(team_id.to_string()))
    }

    pub fn start(&mut self) -> Result<(), RunError> {
        match self.phase {
            RunPhase::Lobby => {
                self.phase = RunPhase::Running;
                Ok(())
            }
            actual => Err(RunError::StateConflict {
                expected: "in lobby",
                actual,
            }),
        }
    }

    pub fn pause(&mut self) -> Result<(), RunError> {
        match self.phase {
            RunPhase::Running => {
                self.phase = RunPhase::Paused;
                Ok(())
            }
            actual => Err(RunError::StateConflict {
                expected: "running",
                actual,
            }),
        }
    }

    pub fn resume(&mut self) -> Result<(), RunError> {
        match self.phase {
            RunPhase::Paused => {
                self.phase = RunPhase::Running;
                Ok(())
            }
            actual => Err(RunError::StateConflict {
                expected: "paused",
                actual,
            }),
        }
    }

    fn require_running(&self) -> Result<(), RunError> {
        if self.phase == RunPhase::Running {
            Ok(())
        } else {
            Err(RunError::StateConflict {
                expected: "running",
                actual: self.phase,
            })
        }
    }

    fn team(&self, team_id: &str) -> Result<&TeamSlot, RunError> {
        self.teams
            .get(team_id)
            .ok_or_else(|| RunError::TeamNotFound(team_id.to_string()))
    }

    fn team_mut(&mut self, team_id: &str) -> Result<&mut TeamSlot, RunError> {
        self.teams
            .get_mut(team_id)
            .ok_or_else(|| RunError::TeamNotFound(team_id.to_string()))
    }

    /// Records or overwrites one role's decision for the team's current
    /// round. Rejected while the run is not running or the team's decisions
    /// are locked.
    pub fn submit_decision(
        &mut self,
        team_id: &str,
        decision: RoleDecision,
    ) -> Result<(), RunError> {
        self.require_running()?;
        let slot = self.team_mut(team_id)?;
        if slot.state.phase != GamePhase::DecisionsOpen {
            return Err(RunError::DecisionsLocked {
                team_id: team_id.to_string(),
                round: slot.state.round,
            });
        }
        slot.pending.submit(decision);
        Ok(())
    }

    /// Queues a facilitator-forced event; it applies during the team's next
    /// advancement with full magnitude for the chosen severity.
    pub fn inject_event(
        &mut self,
        team_id: &str,
        event_type: EventType,
        severity: Severity,
    ) -> Result<(), RunError> {
        self.require_running()?;
        let slot = self.team_mut(team_id)?;
        let round = slot.state.round;
        slot.queued_injections.push(ForcedEventRecord {
            round,
            event_type,
            severity,
        });
        Ok(())
    }

    /// Locks decisions, runs the reducer, and reopens (or completes) the
    /// team. Consumes the pending decisions and any queued injections.
    pub fn advance_team(&mut self, team_id: &str) -> Result<RoundOutcome, RunError> {
        self.require_running()?;
        let scenario = self.scenario.clone();
        let slot = self.team_mut(team_id)?;
        if slot.state.is_complete() {
            return Ok(RoundOutcome {
                state: slot.state.clone(),
                events: Vec::new(),
                narrative: Vec::new(),
            });
        }

        slot.state.phase = GamePhase::DecisionsLocked;
        let pending = std::mem::take(&mut slot.pending);
        let injections = std::mem::take(&mut slot.queued_injections);
        let outcome = reducer::advance_round(&slot.state, &pending, &scenario, &injections);
        slot.state = outcome.state.clone();
        slot.injection_log.extend(injections);

        self.refresh_phase();
        Ok(outcome)
    }

    /// Advances every registered team once, in team-id order.
    pub fn advance_all(&mut self) -> Result<Vec<(String, RoundOutcome)>, RunError> {
        self.require_running()?;
        let team_ids: Vec<String> = self.teams.keys().cloned().collect();
        let mut outcomes = Vec::with_capacity(team_ids.len());
        for team_id in team_ids {
            let outcome = self.advance_team(&team_id)?;
            outcomes.push((team_id, outcome));
        }
        Ok(outcomes)
    }

    fn refresh_phase(&mut self) {
        if self.phase == RunPhase::Running
            && !self.teams.is_empty()
            && self.teams.values().all(|slot| slot.state.is_complete())
        {
            self.phase = RunPhase::Complete;
        }
    }

    pub fn team_state(&self, team_id: &str) -> Result<&GameState, RunError> {
        Ok(&self.team(team_id)?.state)
    }

    pub fn team_summaries(&self) -> Vec<TeamSummary> {
        self.teams
            .iter()
            .map(|(team_id, slot)| TeamSummary {
                team_id: team_id.clone(),
                name: slot.name.clone(),
                round: slot.state.round,
                phase: slot.state.phase,
                total_score: slot.state.scorecard.total,
            })
            .collect()
    }

    /// Teams ordered by total score descending; ties break on team id so
    /// the ordering is stable across calls and replays.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut rows: Vec<(&String, &TeamSlot)> = self.teams.iter().collect();
        rows.sort_by(|(a_id, a), (b_id, b)| {
            b.state
                .scorecard
                .total
                .partial_cmp(&a.state.scorecard.total)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a_id.cmp(b_id))
        });
        rows.into_iter()
            .enumerate()
            .map(|(index, (team_id, slot))| LeaderboardEntry {
                rank: index + 1,
                team_id: team_id.clone(),
                name: slot.name.clone(),
                round: slot.state.round,
                scorecard: slot.state.scorecard.clone(),
            })
            .collect()
    }

    /// Everything needed to reconstruct this run from round 1. Pending
    /// (unadvanced) decisions and queued injections are deliberately not
    /// part of the envelope; only applied history replays.
    pub fn export(&self) -> RunExport {
        RunExport {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: self.run_id.clone(),
            seed: self.seed,
            scenario: self.scenario.clone(),
            phase: self.phase,
            teams: self
                .teams
                .iter()
                .map(|(team_id, slot)| TeamExport {
                    team_id: team_id.clone(),
                    name: slot.name.clone(),
                    rounds_played: slot.state.round.saturating_sub(1),
                    decision_history: slot.state.decision_history.clone(),
                    forced_events: slot.injection_log.clone(),
                })
                .collect(),
        }
    }

    /// Reconstructs a run by replaying every recorded round through the
    /// reducer. Identical seed and history yield identical states.
    pub fn import(export: RunExport) -> Result<Self, ReplayError> {
        if export.schema_version != SCHEMA_VERSION_V1 {
            return Err(ReplayError::SchemaVersion {
                found: export.schema_version,
            });
        }

        let mut manager = Self::new(RunSetup {
            run_id: export.run_id,
            seed: export.seed,
            scenario: export.scenario,
        });
        for team in &export.teams {
            manager.add_team(team.team_id.clone(), team.name.clone())?;
        }
        if export.phase == RunPhase::Lobby {
            return Ok(manager);
        }
        manager.start()?;

        for team in &export.teams {
            for round in 1..=team.rounds_played {
                let decisions = recorded_round_decisions(team, round);
                for decision in decisions {
                    manager.submit_decision(&team.team_id, decision)?;
                }
                for injection in team
                    .forced_events
                    .iter()
                    .filter(|record| record.round == round)
                {
                    manager.inject_event(
                        &team.team_id,
                        injection.event_type,
                        injection.severity,
                    )?;
                }
                manager.advance_team(&team.team_id)?;
            }
        }

        match export.phase {
            RunPhase::Paused => manager.pause()?,
            RunPhase::Lobby | RunPhase::Running | RunPhase::Complete => {}
        }
        Ok(manager)
    }
}

/// Only actively submitted decisions re-submit on replay; defaulted roles
/// are re-defaulted by the reducer, which preserves the recorded origin.
fn recorded_round_decisions(team: &TeamExport, round: u32) -> Vec<RoleDecision> {
    team.decision_history
        .iter()
        .filter(|record| record.round == round)
        .flat_map(|record| &record.decisions)
        .filter(|record| record.origin == DecisionOrigin::Submitted)
        .map(|record| record.decision.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MarketingDecision, CampaignIntensity, StrategyDecision, StrategyPosture};

    fn manager_with_teams(team_ids: &[&str]) -> RunManager {
        let mut manager = RunManager::new(RunSetup {
            run_id: "run-1".to_string(),
            seed: 12345,
            scenario: ScenarioConfig::default(),
        });
        for team_id in team_ids {
            manager.add_team(*team_id, format!("Team {team_id}")).unwrap();
        }
        manager
    }

    #[test]
    fn lifecycle_transitions_are_enforced() {
        let mut manager = manager_with_teams(&["a"]);
        assert_eq!(manager.phase(), RunPhase::Lobby);
        assert!(matches!(
            manager.pause(),
            Err(RunError::StateConflict { .. })
        ));
        manager.start().unwrap();
        assert!(matches!(
            manager.start(),
            Err(RunError::StateConflict { .. })
        ));
        manager.pause().unwrap();
        assert!(matches!(
            manager.advance_team("a"),
            Err(RunError::StateConflict { .. })
        ));
        manager.resume().unwrap();
        manager.advance_team("a").unwrap();
    }

    #[test]
    fn duplicate_team_is_rejected() {
        let mut manager = manager_with_teams(&["a"]);
        assert!(matches!(
            manager.add_team("a", "Again"),
            Err(RunError::DuplicateTeam(_))
        ));
    }

    #[test]
    fn submission_rejected_before_start() {
        let mut manager = manager_with_teams(&["a"]);
        let result = manager.submit_decision(
            "a",
            RoleDecision::Strategy(StrategyDecision::default()),
        );
        assert!(matches!(result, Err(RunError::StateConflict { .. })));
    }

    #[test]
    fn teams_sharing_a_seed_stay_identical_under_identical_decisions() {
        let mut manager = manager_with_teams(&["a", "b"]);
        manager.start().unwrap();
        for _ in 0..3 {
            manager.advance_all().unwrap();
        }
        let a = manager.team_state("a").unwrap();
        let b = manager.team_state("b").unwrap();
        assert_eq!(a.company, b.company);
        assert_eq!(a.round, b.round);
        assert_eq!(
            a.event_history
                .iter()
                .map(|event| (event.event_type, event.severity))
                .collect::<Vec<_>>(),
            b.event_history
                .iter()
                .map(|event| (event.event_type, event.severity))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn leaderboard_breaks_ties_on_team_id() {
        let mut manager = manager_with_teams(&["beta", "alpha"]);
        manager.start().unwrap();
        let board = manager.leaderboard();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].team_id, "alpha");
        assert_eq!(board[1].team_id, "beta");
    }

    #[test]
    fn run_completes_when_every_team_finishes() {
        let mut manager = manager_with_teams(&["a"]);
        manager.start().unwrap();
        let max_rounds = manager.scenario().max_rounds;
        for _ in 1..max_rounds {
            manager.advance_all().unwrap();
        }
        let state = manager.team_state("a").unwrap();
        assert_eq!(state.round, max_rounds);
        assert_eq!(state.phase, GamePhase::Complete);
        assert_eq!(manager.phase(), RunPhase::Complete);
        assert!(matches!(
            manager.advance_team("a"),
            Err(RunError::StateConflict { .. })
        ));
    }

    #[test]
    fn finished_team_holds_at_round_bound_while_others_play() {
        let mut manager = manager_with_teams(&["a", "b"]);
        manager.start().unwrap();
        let max_rounds = manager.scenario().max_rounds;
        for _ in 1..max_rounds {
            manager.advance_team("a").unwrap();
        }
        // The run stays running for "b", so further advances of "a" reach
        // the reducer and must leave the finished state untouched.
        let before = manager.team_state("a").unwrap().clone();
        assert_eq!(before.round, max_rounds);
        let outcome = manager.advance_team("a").unwrap();
        assert_eq!(outcome.state, before);
        assert!(outcome.events.is_empty());
        assert_eq!(manager.team_state("a").unwrap().round, max_rounds);
        assert_eq!(manager.team_state("a").unwrap().phase, GamePhase::Complete);
    }

    #[test]
    fn export_then_import_reproduces_states_exactly() {
        let mut manager = manager_with_teams(&["a", "b"]);
        manager.start().unwrap();
        manager
            .submit_decision(
                "a",
                RoleDecision::Strategy(StrategyDecision {
                    posture: StrategyPosture::Expand,
                    expansion_spend: 2.0,
                }),
            )
            .unwrap();
        manager.advance_all().unwrap();
        manager
            .submit_decision(
                "b",
                RoleDecision::Marketing(MarketingDecision {
                    campaign: CampaignIntensity::Targeted,
                    spend: 1.5,
                    brand_push: false,
                }),
            )
            .unwrap();
        manager
            .inject_event("b", EventType::SupplyShock, Severity::Medium)
            .unwrap();
        manager.advance_all().unwrap();

        let export = manager.export();
        let replayed = RunManager::import(export.clone()).unwrap();

        assert_eq!(replayed.phase(), manager.phase());
        for team_id in ["a", "b"] {
            assert_eq!(
                replayed.team_state(team_id).unwrap(),
                manager.team_state(team_id).unwrap()
            );
        }
        assert_eq!(replayed.export(), export);
    }

    #[test]
    fn import_rejects_unknown_schema_version() {
        let manager = manager_with_teams(&[]);
        let mut export = manager.export();
        export.schema_version = "2.0".to_string();
        assert!(matches!(
            RunManager::import(export),
            Err(ReplayError::SchemaVersion { .. })
        ));
    }
}
