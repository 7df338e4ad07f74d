//! In-process API facade over the run manager, with command auditing and
//! SQLite persistence.

mod persistence;
mod server;

use std::path::Path;

use contracts::{
    ApiError, Command, CommandPayload, CommandResult, CommandType, ErrorCode, GameState,
    LeaderboardEntry, RunExport, RunStatus, TeamSummary, SCHEMA_VERSION_V1,
};
use sim_core::run::{ReplayError, RunError, RunManager, RunSetup};
use sim_core::RoundOutcome;
use tracing::warn;

use persistence::{RoundDeltaRow, SqliteRunStore, TeamSnapshotRow};
pub use persistence::{PersistedRunSummary, PersistenceError};
pub use server::{serve, ServerError};

#[derive(Debug)]
pub struct EngineApi {
    run: RunManager,
    command_audit: Vec<CommandResult>,
    store: Option<SqliteRunStore>,
    last_persistence_error: Option<String>,
}

impl EngineApi {
    pub fn from_setup(setup: RunSetup) -> Self {
        Self {
            run: RunManager::new(setup),
            command_audit: Vec::new(),
            store: None,
            last_persistence_error: None,
        }
    }

    /// Reconstructs an engine from a replay envelope. The rebuilt run is
    /// byte-identical to the exporter's given the same seed and history.
    pub fn from_export(export: RunExport) -> Result<Self, ReplayError> {
        Ok(Self {
            run: RunManager::import(export)?,
            command_audit: Vec::new(),
            store: None,
            last_persistence_error: None,
        })
    }

    pub fn attach_sqlite_store(&mut self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        self.store = Some(SqliteRunStore::open(path)?);
        Ok(())
    }

    /// Claims the run id in storage. An existing run with the same id is
    /// either deleted or reported as a conflict, caller's choice.
    pub fn initialize_run_storage(
        &mut self,
        replace_existing_run: bool,
    ) -> Result<(), PersistenceError> {
        let Some(store) = self.store.as_mut() else {
            return Err(PersistenceError::NotAttached);
        };

        let run_id = self.run.run_id().to_string();
        if store.run_exists(&run_id)? {
            if replace_existing_run {
                store.delete_run(&run_id)?;
            } else {
                return Err(PersistenceError::RunAlreadyExists(run_id));
            }
        }

        Self::flush_shell(store, &self.run)?;
        self.last_persistence_error = None;
        Ok(())
    }

    pub fn status(&self) -> RunStatus {
        self.run.status()
    }

    pub fn run_id(&self) -> &str {
        self.run.run_id()
    }

    pub fn run_manager(&self) -> &RunManager {
        &self.run
    }

    pub fn command_audit(&self) -> &[CommandResult] {
        &self.command_audit
    }

    pub fn last_persistence_error(&self) -> Option<&str> {
        self.last_persistence_error.as_deref()
    }

    pub fn start(&mut self) -> Result<RunStatus, RunError> {
        self.run.start()?;
        self.flush_shell_if_enabled();
        Ok(self.run.status())
    }

    pub fn pause(&mut self) -> Result<RunStatus, RunError> {
        self.run.pause()?;
        self.flush_shell_if_enabled();
        Ok(self.run.status())
    }

    pub fn resume(&mut self) -> Result<RunStatus, RunError> {
        self.run.resume()?;
        self.flush_shell_if_enabled();
        Ok(self.run.status())
    }

    pub fn add_team(
        &mut self,
        team_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<(), RunError> {
        self.run.add_team(team_id, name)?;
        self.flush_shell_if_enabled();
        Ok(())
    }

    pub fn remove_team(&mut self, team_id: &str) -> Result<(), RunError> {
        self.run.remove_team(team_id)?;
        self.flush_shell_if_enabled();
        Ok(())
    }

    pub fn submit_decision(
        &mut self,
        team_id: &str,
        decision: contracts::RoleDecision,
    ) -> Result<(), RunError> {
        self.run.submit_decision(team_id, decision)
    }

    pub fn inject_event(
        &mut self,
        team_id: &str,
        event_type: contracts::EventType,
        severity: contracts::Severity,
    ) -> Result<(), RunError> {
        self.run.inject_event(team_id, event_type, severity)
    }

    pub fn advance_team(&mut self, team_id: &str) -> Result<RoundOutcome, RunError> {
        let outcome = self.run.advance_team(team_id)?;
        self.persist_outcomes_if_enabled(&[(team_id.to_string(), outcome.clone())]);
        Ok(outcome)
    }

    pub fn advance_all(&mut self) -> Result<Vec<(String, RoundOutcome)>, RunError> {
        let outcomes = self.run.advance_all()?;
        self.persist_outcomes_if_enabled(&outcomes);
        Ok(outcomes)
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.run.leaderboard()
    }

    pub fn team_summaries(&self) -> Vec<TeamSummary> {
        self.run.team_summaries()
    }

    pub fn team_state(&self, team_id: &str) -> Result<&GameState, RunError> {
        self.run.team_state(team_id)
    }

    pub fn export_replay(&self) -> RunExport {
        self.run.export()
    }

    pub fn list_runs(&self) -> Result<Vec<PersistedRunSummary>, PersistenceError> {
        match self.store.as_ref() {
            Some(store) => store.list_runs(),
            None => Err(PersistenceError::NotAttached),
        }
    }

    pub fn load_replay(&self, run_id: &str) -> Result<RunExport, PersistenceError> {
        match self.store.as_ref() {
            Some(store) => store.load_export(run_id),
            None => Err(PersistenceError::NotAttached),
        }
    }

    /// Last persisted snapshot of one team, straight from the store. Lets
    /// replay tooling cross-check a rebuilt run against what was written.
    pub fn load_stored_team_state(
        &self,
        run_id: &str,
        team_id: &str,
    ) -> Result<Option<GameState>, PersistenceError> {
        match self.store.as_ref() {
            Some(store) => store.load_team_state(run_id, team_id),
            None => Err(PersistenceError::NotAttached),
        }
    }

    /// Persisted event slice for a round window, in fired order.
    pub fn load_stored_events(
        &self,
        run_id: &str,
        team_id: &str,
        from_round: u32,
        to_round: u32,
    ) -> Result<Vec<contracts::Event>, PersistenceError> {
        match self.store.as_ref() {
            Some(store) => store.load_events_range(run_id, team_id, from_round, to_round),
            None => Err(PersistenceError::NotAttached),
        }
    }

    /// Full command-envelope entry point used by the HTTP layer: validates,
    /// dispatches, and appends to the audit log. Rejections are results,
    /// not errors.
    pub fn submit_command(&mut self, command: Command) -> CommandResult {
        let result = match self.validate_command(&command) {
            Some(error) => CommandResult::rejected(&command, error),
            None => match self.dispatch_command(&command) {
                Ok(()) => CommandResult::accepted(&command),
                Err(error) => CommandResult::rejected(&command, run_error_to_api(&error)),
            },
        };
        self.command_audit.push(result.clone());
        result
    }

    fn validate_command(&self, command: &Command) -> Option<ApiError> {
        if command.schema_version != SCHEMA_VERSION_V1 {
            return Some(ApiError::new(
                ErrorCode::InvalidCommand,
                "unsupported schema_version",
                Some(format!(
                    "got={} expected={SCHEMA_VERSION_V1}",
                    command.schema_version
                )),
            ));
        }
        if command.run_id != self.run.run_id() {
            return Some(ApiError::new(
                ErrorCode::RunNotFound,
                "command.run_id does not match active run",
                None,
            ));
        }
        if !command_type_matches_payload(command.command_type, &command.payload) {
            return Some(ApiError::new(
                ErrorCode::InvalidCommand,
                "command_type does not match payload variant",
                None,
            ));
        }
        None
    }

    fn dispatch_command(&mut self, command: &Command) -> Result<(), RunError> {
        match &command.payload {
            CommandPayload::RunStart => self.start().map(|_| ()),
            CommandPayload::RunPause => self.pause().map(|_| ()),
            CommandPayload::RunResume => self.resume().map(|_| ()),
            CommandPayload::AddTeam { team_id, name } => {
                self.add_team(team_id.clone(), name.clone())
            }
            CommandPayload::RemoveTeam { team_id } => self.remove_team(team_id),
            CommandPayload::SubmitDecision {
                team_id, decision, ..
            } => self.submit_decision(team_id, decision.clone()),
            CommandPayload::AdvanceTeam { team_id } => self.advance_team(team_id).map(|_| ()),
            CommandPayload::AdvanceAll => self.advance_all().map(|_| ()),
            CommandPayload::InjectEvent {
                team_id,
                event_type,
                severity,
            } => self.inject_event(team_id, *event_type, *severity),
        }
    }

    fn persist_outcomes_if_enabled(&mut self, outcomes: &[(String, RoundOutcome)]) {
        if self.store.is_none() {
            return;
        }
        if let Err(err) = self.persist_outcomes_checked(outcomes) {
            warn!(error = %err, "round persistence failed");
            self.last_persistence_error = Some(err.to_string());
        } else {
            self.last_persistence_error = None;
        }
    }

    fn persist_outcomes_checked(
        &mut self,
        outcomes: &[(String, RoundOutcome)],
    ) -> Result<(), PersistenceError> {
        let Self { store, run, .. } = self;
        let Some(store) = store.as_mut() else {
            return Err(PersistenceError::NotAttached);
        };

        let status = run.status();
        let export = run.export();
        let summaries = run.team_summaries();
        let teams: Vec<TeamSnapshotRow<'_>> = summaries
            .iter()
            .filter_map(|summary| {
                run.team_state(&summary.team_id)
                    .ok()
                    .map(|state| TeamSnapshotRow {
                        name: &summary.name,
                        state,
                    })
            })
            .collect();

        let mut deltas = Vec::new();
        for (team_id, outcome) in outcomes {
            let Some(decisions) = outcome.state.decision_history.last() else {
                // Terminal no-op advance: nothing new to write.
                continue;
            };
            deltas.push(RoundDeltaRow {
                team_id,
                round: decisions.round,
                decisions,
                events: &outcome.events,
                narrative: &outcome.narrative,
                scorecard: &outcome.state.scorecard,
            });
        }

        store.persist_delta(&status, run.scenario(), &export, &teams, &deltas)?;
        Ok(())
    }

    fn flush_shell_if_enabled(&mut self) {
        let run = &self.run;
        if let Some(store) = self.store.as_mut() {
            if let Err(err) = Self::flush_shell(store, run) {
                warn!(error = %err, "run shell persistence failed");
                self.last_persistence_error = Some(err.to_string());
            }
        }
    }

    /// Persists the run header and team snapshots with no round deltas.
    fn flush_shell(store: &mut SqliteRunStore, run: &RunManager) -> Result<(), PersistenceError> {
        let summaries = run.team_summaries();
        let teams: Vec<TeamSnapshotRow<'_>> = summaries
            .iter()
            .filter_map(|summary| {
                run.team_state(&summary.team_id)
                    .ok()
                    .map(|state| TeamSnapshotRow {
                        name: &summary.name,
                        state,
                    })
            })
            .collect();
        store.persist_delta(&run.status(), run.scenario(), &run.export(), &teams, &[])
    }
}

fn command_type_matches_payload(command_type: CommandType, payload: &CommandPayload) -> bool {
    matches!(
        (command_type, payload),
        (CommandType::RunStart, CommandPayload::RunStart)
            | (CommandType::RunPause, CommandPayload::RunPause)
            | (CommandType::RunResume, CommandPayload::RunResume)
            | (CommandType::AddTeam, CommandPayload::AddTeam { .. })
            | (CommandType::RemoveTeam, CommandPayload::RemoveTeam { .. })
            | (
                CommandType::SubmitDecision,
                CommandPayload::SubmitDecision { .. }
            )
            | (CommandType::AdvanceTeam, CommandPayload::AdvanceTeam { .. })
            | (CommandType::AdvanceAll, CommandPayload::AdvanceAll)
            | (CommandType::InjectEvent, CommandPayload::InjectEvent { .. })
    )
}

fn run_error_to_api(error: &RunError) -> ApiError {
    match error {
        RunError::TeamNotFound(team_id) => ApiError::new(
            ErrorCode::TeamNotFound,
            "team_id is not registered in this run",
            Some(format!("team_id={team_id}")),
        ),
        RunError::DuplicateTeam(team_id) => ApiError::new(
            ErrorCode::InvalidCommand,
            "team_id is already registered",
            Some(format!("team_id={team_id}")),
        ),
        RunError::DecisionsLocked { team_id, round } => ApiError::new(
            ErrorCode::DecisionsLocked,
            "decisions are locked for this round",
            Some(format!("team_id={team_id} round={round}")),
        ),
        RunError::StateConflict { expected, actual } => ApiError::new(
            ErrorCode::RunStateConflict,
            "run phase does not allow this operation",
            Some(format!("expected={expected} actual={actual:?}")),
        ),
    }
}
