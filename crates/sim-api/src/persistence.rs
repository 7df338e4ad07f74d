use std::fmt;
use std::path::Path;

use contracts::{
    Event, GameState, NarrativeEntry, RoundDecisionRecord, RunExport, RunStatus, ScenarioConfig,
    Scorecard,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// One row of `list_runs`, enough for a run picker without loading the
/// full export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedRunSummary {
    pub run_id: String,
    pub scenario_key: String,
    pub phase: String,
    pub team_count: usize,
    pub max_rounds: u32,
    pub updated_at: String,
}

#[derive(Debug)]
pub enum PersistenceError {
    Sqlite(rusqlite::Error),
    Serde(serde_json::Error),
    NotAttached,
    RunAlreadyExists(String),
    RunNotFound(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Serde(err) => write!(f, "serde error: {err}"),
            Self::NotAttached => write!(f, "sqlite store is not attached"),
            Self::RunAlreadyExists(run_id) => write!(f, "run already exists: {run_id}"),
            Self::RunNotFound(run_id) => write!(f, "run not found: {run_id}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

/// A team's current row in the `teams` table.
#[derive(Debug, Clone, Copy)]
pub struct TeamSnapshotRow<'a> {
    pub name: &'a str,
    pub state: &'a GameState,
}

/// One advanced round's additions for one team, written in the same
/// transaction as the updated team snapshot.
#[derive(Debug, Clone, Copy)]
pub struct RoundDeltaRow<'a> {
    pub team_id: &'a str,
    pub round: u32,
    pub decisions: &'a RoundDecisionRecord,
    pub events: &'a [Event],
    pub narrative: &'a [NarrativeEntry],
    pub scorecard: &'a Scorecard,
}

#[derive(Debug)]
pub struct SqliteRunStore {
    conn: Connection,
}

impl SqliteRunStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    pub fn run_exists(&self, run_id: &str) -> Result<bool, PersistenceError> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT run_id FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn delete_run(&mut self, run_id: &str) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction()?;
        for table in [
            "scorecards",
            "narrative",
            "events",
            "decisions",
            "teams",
            "runs",
        ] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE run_id = ?1"),
                params![run_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Writes the run header, every team's current snapshot, and the given
    /// round deltas in one transaction. The full export envelope rides along
    /// on the run row so replay never has to reassemble it from the tables.
    pub fn persist_delta(
        &mut self,
        status: &RunStatus,
        scenario: &ScenarioConfig,
        export: &RunExport,
        teams: &[TeamSnapshotRow<'_>],
        deltas: &[RoundDeltaRow<'_>],
    ) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction()?;

        upsert_run(&tx, status, scenario, export)?;
        for team in teams {
            upsert_team(&tx, team)?;
        }
        for delta in deltas {
            insert_round_delta(&tx, &status.run_id, delta)?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn list_runs(&self) -> Result<Vec<PersistedRunSummary>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, scenario_key, phase, team_count, max_rounds, updated_at
             FROM runs
             ORDER BY run_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PersistedRunSummary {
                run_id: row.get(0)?,
                scenario_key: row.get(1)?,
                phase: row.get(2)?,
                team_count: row.get::<_, i64>(3)? as usize,
                max_rounds: row.get::<_, i64>(4)? as u32,
                updated_at: row.get(5)?,
            })
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    pub fn load_export(&self, run_id: &str) -> Result<RunExport, PersistenceError> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT export_json FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(raw) => Ok(serde_json::from_str::<RunExport>(&raw)?),
            None => Err(PersistenceError::RunNotFound(run_id.to_string())),
        }
    }

    pub fn load_team_state(
        &self,
        run_id: &str,
        team_id: &str,
    ) -> Result<Option<GameState>, PersistenceError> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT state_json FROM teams WHERE run_id = ?1 AND team_id = ?2",
                params![run_id, team_id],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(raw) => Ok(Some(serde_json::from_str::<GameState>(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn load_events_range(
        &self,
        run_id: &str,
        team_id: &str,
        from_round: u32,
        to_round: u32,
    ) -> Result<Vec<Event>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT payload_json
             FROM events
             WHERE run_id = ?1 AND team_id = ?2 AND round >= ?3 AND round <= ?4
             ORDER BY round ASC, event_id ASC",
        )?;
        let rows = stmt.query_map(
            params![run_id, team_id, i64::from(from_round), i64::from(to_round)],
            |row| row.get::<_, String>(0),
        )?;

        let mut events = Vec::new();
        for row in rows {
            events.push(serde_json::from_str::<Event>(&row?)?);
        }
        Ok(events)
    }

    fn configure(&mut self) -> Result<(), PersistenceError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn migrate(&mut self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS runs (
                run_id TEXT PRIMARY KEY,
                schema_version TEXT NOT NULL,
                scenario_key TEXT NOT NULL,
                seed TEXT NOT NULL,
                max_rounds INTEGER NOT NULL,
                phase TEXT NOT NULL,
                team_count INTEGER NOT NULL,
                scenario_json TEXT NOT NULL,
                export_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS teams (
                run_id TEXT NOT NULL,
                team_id TEXT NOT NULL,
                name TEXT NOT NULL,
                round INTEGER NOT NULL,
                phase TEXT NOT NULL,
                total_score REAL NOT NULL,
                state_json TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (run_id, team_id)
            );

            CREATE TABLE IF NOT EXISTS decisions (
                run_id TEXT NOT NULL,
                team_id TEXT NOT NULL,
                round INTEGER NOT NULL,
                role TEXT NOT NULL,
                origin TEXT NOT NULL,
                decision_json TEXT NOT NULL,
                PRIMARY KEY (run_id, team_id, round, role)
            );

            CREATE TABLE IF NOT EXISTS events (
                run_id TEXT NOT NULL,
                team_id TEXT NOT NULL,
                event_id TEXT NOT NULL,
                round INTEGER NOT NULL,
                event_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                forced INTEGER NOT NULL,
                payload_json TEXT NOT NULL,
                PRIMARY KEY (run_id, event_id)
            );

            CREATE TABLE IF NOT EXISTS narrative (
                run_id TEXT NOT NULL,
                team_id TEXT NOT NULL,
                round INTEGER NOT NULL,
                seq INTEGER NOT NULL,
                category TEXT NOT NULL,
                impact TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                PRIMARY KEY (run_id, team_id, round, seq)
            );

            CREATE TABLE IF NOT EXISTS scorecards (
                run_id TEXT NOT NULL,
                team_id TEXT NOT NULL,
                round INTEGER NOT NULL,
                payload_json TEXT NOT NULL,
                PRIMARY KEY (run_id, team_id, round)
            );

            CREATE INDEX IF NOT EXISTS idx_events_run_team_round ON events(run_id, team_id, round);
            CREATE INDEX IF NOT EXISTS idx_narrative_run_team_round ON narrative(run_id, team_id, round);
            CREATE INDEX IF NOT EXISTS idx_decisions_run_team_round ON decisions(run_id, team_id, round);
            ",
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO schema_migrations(version, name, applied_at)
             VALUES(1, 'initial_v1', 'round-000')",
            [],
        )?;

        Ok(())
    }
}

fn upsert_run(
    tx: &rusqlite::Transaction<'_>,
    status: &RunStatus,
    scenario: &ScenarioConfig,
    export: &RunExport,
) -> Result<(), PersistenceError> {
    let scenario_json = serde_json::to_string(scenario)?;
    let export_json = serde_json::to_string(export)?;
    let updated_round = export
        .teams
        .iter()
        .map(|team| team.rounds_played)
        .max()
        .unwrap_or(0);

    tx.execute(
        "INSERT INTO runs (
            run_id,
            schema_version,
            scenario_key,
            seed,
            max_rounds,
            phase,
            team_count,
            scenario_json,
            export_json,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(run_id) DO UPDATE SET
            schema_version = excluded.schema_version,
            scenario_key = excluded.scenario_key,
            seed = excluded.seed,
            max_rounds = excluded.max_rounds,
            phase = excluded.phase,
            team_count = excluded.team_count,
            scenario_json = excluded.scenario_json,
            export_json = excluded.export_json,
            updated_at = excluded.updated_at",
        params![
            status.run_id.as_str(),
            status.schema_version.as_str(),
            status.scenario_key.as_str(),
            status.seed.to_string(),
            i64::from(status.max_rounds),
            format!("{:?}", status.phase),
            status.team_count as i64,
            scenario_json,
            export_json,
            "round-000",
            round_stamp(updated_round),
        ],
    )?;
    Ok(())
}

fn upsert_team(
    tx: &rusqlite::Transaction<'_>,
    team: &TeamSnapshotRow<'_>,
) -> Result<(), PersistenceError> {
    let state = team.state;
    let state_json = serde_json::to_string(state)?;
    tx.execute(
        "INSERT INTO teams (
            run_id, team_id, name, round, phase, total_score, state_json, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(run_id, team_id) DO UPDATE SET
            name = excluded.name,
            round = excluded.round,
            phase = excluded.phase,
            total_score = excluded.total_score,
            state_json = excluded.state_json,
            updated_at = excluded.updated_at",
        params![
            state.run_id.as_str(),
            state.team_id.as_str(),
            team.name,
            i64::from(state.round),
            format!("{:?}", state.phase),
            state.scorecard.total,
            state_json,
            round_stamp(state.round),
        ],
    )?;
    Ok(())
}

fn insert_round_delta(
    tx: &rusqlite::Transaction<'_>,
    run_id: &str,
    delta: &RoundDeltaRow<'_>,
) -> Result<(), PersistenceError> {
    for record in &delta.decisions.decisions {
        let decision_json = serde_json::to_string(&record.decision)?;
        tx.execute(
            "INSERT OR IGNORE INTO decisions (
                run_id, team_id, round, role, origin, decision_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run_id,
                delta.team_id,
                i64::from(delta.round),
                record.role.as_str(),
                format!("{:?}", record.origin),
                decision_json,
            ],
        )?;
    }

    for event in delta.events {
        let payload_json = serde_json::to_string(event)?;
        tx.execute(
            "INSERT OR IGNORE INTO events (
                run_id, team_id, event_id, round, event_type, severity, forced, payload_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run_id,
                delta.team_id,
                event.event_id.as_str(),
                i64::from(event.round),
                event.event_type.as_str(),
                format!("{:?}", event.severity),
                if event.forced { 1_i64 } else { 0_i64 },
                payload_json,
            ],
        )?;
    }

    for (seq, entry) in delta.narrative.iter().enumerate() {
        let payload_json = serde_json::to_string(entry)?;
        tx.execute(
            "INSERT OR IGNORE INTO narrative (
                run_id, team_id, round, seq, category, impact, payload_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run_id,
                delta.team_id,
                i64::from(delta.round),
                seq as i64,
                format!("{:?}", entry.category),
                format!("{:?}", entry.impact),
                payload_json,
            ],
        )?;
    }

    let scorecard_json = serde_json::to_string(delta.scorecard)?;
    tx.execute(
        "INSERT OR IGNORE INTO scorecards (
            run_id, team_id, round, payload_json
        ) VALUES (?1, ?2, ?3, ?4)",
        params![
            run_id,
            delta.team_id,
            i64::from(delta.round),
            scorecard_json,
        ],
    )?;

    Ok(())
}

fn round_stamp(round: u32) -> String {
    format!("round-{round:03}")
}
