#[derive(Debug, Deserialize)]
struct CreateRunRequest {
    run_id: String,
    #[serde(default, with = "contracts::serde_u64_string")]
    seed: u64,
    scenario: Option<ScenarioConfig>,
    auto_start: Option<bool>,
    sqlite_path: Option<String>,
    replace_existing: Option<bool>,
}

#[derive(Debug, Serialize)]
struct CreateRunResponse {
    schema_version: String,
    run_id: String,
    status: RunStatus,
    replaced_existing_run: bool,
    started: bool,
}

async fn create_run(
    State(state): State<AppState>,
    Json(request): Json<CreateRunRequest>,
) -> Result<Json<CreateRunResponse>, HttpApiError> {
    let auto_start = request.auto_start.unwrap_or(false);
    let sqlite_path = request
        .sqlite_path
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path);
    let replace_existing = request.replace_existing.unwrap_or(true);

    let response = {
        let mut inner = state.inner.lock().await;
        let replaced_existing_run = inner.engine.is_some();

        let mut engine = EngineApi::from_setup(RunSetup {
            run_id: request.run_id.clone(),
            seed: request.seed,
            scenario: request.scenario.unwrap_or_default(),
        });
        engine
            .attach_sqlite_store(sqlite_path)
            .map_err(HttpApiError::from_persistence)?;
        engine
            .initialize_run_storage(replace_existing)
            .map_err(HttpApiError::from_persistence)?;

        if auto_start {
            engine.start().map_err(|err| HttpApiError::from_run_error(&err))?;
        }

        let status = engine.status();
        inner.engine = Some(engine);

        CreateRunResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: status.run_id.clone(),
            status,
            replaced_existing_run,
            started: auto_start,
        }
    };

    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct RunControlResponse {
    schema_version: String,
    run_id: String,
    status: RunStatus,
}

fn control_response(status: RunStatus) -> RunControlResponse {
    RunControlResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        run_id: status.run_id.clone(),
        status,
    }
}

async fn start_run(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RunControlResponse>, HttpApiError> {
    let mut inner = state.inner.lock().await;
    let engine = require_run_mut(&mut inner, &run_id)?;
    let status = engine
        .start()
        .map_err(|err| HttpApiError::from_run_error(&err))?;
    Ok(Json(control_response(status)))
}

async fn pause_run(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RunControlResponse>, HttpApiError> {
    let mut inner = state.inner.lock().await;
    let engine = require_run_mut(&mut inner, &run_id)?;
    let status = engine
        .pause()
        .map_err(|err| HttpApiError::from_run_error(&err))?;
    Ok(Json(control_response(status)))
}

async fn resume_run(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RunControlResponse>, HttpApiError> {
    let mut inner = state.inner.lock().await;
    let engine = require_run_mut(&mut inner, &run_id)?;
    let status = engine
        .resume()
        .map_err(|err| HttpApiError::from_run_error(&err))?;
    Ok(Json(control_response(status)))
}

#[derive(Debug, Deserialize)]
struct AddTeamRequest {
    team_id: String,
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct TeamControlResponse {
    schema_version: String,
    run_id: String,
    team_id: String,
    teams: Vec<TeamSummary>,
}

async fn add_team(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<AddTeamRequest>,
) -> Result<Json<TeamControlResponse>, HttpApiError> {
    let mut inner = state.inner.lock().await;
    let engine = require_run_mut(&mut inner, &run_id)?;
    let name = request
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| request.team_id.clone());
    engine
        .add_team(request.team_id.clone(), name)
        .map_err(|err| HttpApiError::from_run_error(&err))?;
    Ok(Json(TeamControlResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        run_id,
        team_id: request.team_id,
        teams: engine.team_summaries(),
    }))
}

async fn remove_team(
    Path((run_id, team_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<TeamControlResponse>, HttpApiError> {
    let mut inner = state.inner.lock().await;
    let engine = require_run_mut(&mut inner, &run_id)?;
    engine
        .remove_team(&team_id)
        .map_err(|err| HttpApiError::from_run_error(&err))?;
    Ok(Json(TeamControlResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        run_id,
        team_id,
        teams: engine.team_summaries(),
    }))
}

#[derive(Debug, Deserialize)]
struct SubmitDecisionsRequest {
    decisions: Vec<RoleDecision>,
}

#[derive(Debug, Serialize)]
struct SubmitDecisionsResponse {
    schema_version: String,
    run_id: String,
    team_id: String,
    accepted: usize,
}

async fn submit_decisions(
    Path((run_id, team_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Json(request): Json<SubmitDecisionsRequest>,
) -> Result<Json<SubmitDecisionsResponse>, HttpApiError> {
    if request.decisions.is_empty() {
        return Err(HttpApiError::invalid_command(
            "decisions must not be empty",
            None,
        ));
    }

    let mut inner = state.inner.lock().await;
    let engine = require_run_mut(&mut inner, &run_id)?;
    let accepted = request.decisions.len();
    for decision in request.decisions {
        engine
            .submit_decision(&team_id, decision)
            .map_err(|err| HttpApiError::from_run_error(&err))?;
    }
    Ok(Json(SubmitDecisionsResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        run_id,
        team_id,
        accepted,
    }))
}

#[derive(Debug, Serialize)]
struct AdvanceResponse {
    schema_version: String,
    run_id: String,
    status: RunStatus,
    advanced: Vec<AdvancedTeam>,
}

#[derive(Debug, Serialize)]
struct AdvancedTeam {
    team_id: String,
    round: u32,
    events: usize,
    narrative: usize,
    total_score: f64,
}

async fn advance_team(
    Path((run_id, team_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<AdvanceResponse>, HttpApiError> {
    let mut inner = state.inner.lock().await;
    let engine = require_run_mut(&mut inner, &run_id)?;
    let outcome = engine
        .advance_team(&team_id)
        .map_err(|err| HttpApiError::from_run_error(&err))?;
    Ok(Json(AdvanceResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        run_id,
        status: engine.status(),
        advanced: vec![advanced_team(&team_id, &outcome)],
    }))
}

async fn advance_all(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AdvanceResponse>, HttpApiError> {
    let mut inner = state.inner.lock().await;
    let engine = require_run_mut(&mut inner, &run_id)?;
    let outcomes = engine
        .advance_all()
        .map_err(|err| HttpApiError::from_run_error(&err))?;
    Ok(Json(AdvanceResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        run_id,
        status: engine.status(),
        advanced: outcomes
            .iter()
            .map(|(team_id, outcome)| advanced_team(team_id, outcome))
            .collect(),
    }))
}

fn advanced_team(team_id: &str, outcome: &sim_core::RoundOutcome) -> AdvancedTeam {
    AdvancedTeam {
        team_id: team_id.to_string(),
        round: outcome.state.round,
        events: outcome.events.len(),
        narrative: outcome.narrative.len(),
        total_score: outcome.state.scorecard.total,
    }
}

#[derive(Debug, Deserialize)]
struct InjectEventRequest {
    event_type: EventType,
    severity: Severity,
}

#[derive(Debug, Serialize)]
struct InjectEventResponse {
    schema_version: String,
    run_id: String,
    team_id: String,
    queued_for_round: u32,
}

async fn inject_event(
    Path((run_id, team_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Json(request): Json<InjectEventRequest>,
) -> Result<Json<InjectEventResponse>, HttpApiError> {
    let mut inner = state.inner.lock().await;
    let engine = require_run_mut(&mut inner, &run_id)?;
    engine
        .inject_event(&team_id, request.event_type, request.severity)
        .map_err(|err| HttpApiError::from_run_error(&err))?;
    let queued_for_round = engine
        .team_state(&team_id)
        .map(|state_ref| state_ref.round)
        .map_err(|err| HttpApiError::from_run_error(&err))?;
    Ok(Json(InjectEventResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        run_id,
        team_id,
        queued_for_round,
    }))
}

#[derive(Debug, Deserialize)]
struct ImportRunRequest {
    export: RunExport,
    sqlite_path: Option<String>,
}

async fn import_run(
    State(state): State<AppState>,
    Json(request): Json<ImportRunRequest>,
) -> Result<Json<CreateRunResponse>, HttpApiError> {
    let response = {
        let mut inner = state.inner.lock().await;
        let replaced_existing_run = inner.engine.is_some();

        let mut engine =
            EngineApi::from_export(request.export).map_err(HttpApiError::from_replay)?;
        if let Some(path) = request.sqlite_path.filter(|path| !path.trim().is_empty()) {
            engine
                .attach_sqlite_store(path)
                .map_err(HttpApiError::from_persistence)?;
            engine
                .initialize_run_storage(true)
                .map_err(HttpApiError::from_persistence)?;
        }

        let status = engine.status();
        inner.engine = Some(engine);

        CreateRunResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: status.run_id.clone(),
            status,
            replaced_existing_run,
            started: false,
        }
    };

    Ok(Json(response))
}

async fn submit_command(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
    Json(command): Json<Command>,
) -> Result<Json<CommandResult>, HttpApiError> {
    if command.run_id != run_id {
        return Err(HttpApiError::invalid_command(
            "command.run_id must match path run_id",
            Some(format!(
                "path_run_id={run_id} command_run_id={}",
                command.run_id
            )),
        ));
    }

    let mut inner = state.inner.lock().await;
    let engine = require_run_mut(&mut inner, &run_id)?;
    Ok(Json(engine.submit_command(command)))
}

#[derive(Debug, Serialize)]
struct CommandAuditPage {
    schema_version: String,
    run_id: String,
    cursor: usize,
    next_cursor: Option<usize>,
    entries: Vec<CommandResult>,
}

async fn get_commands(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<CommandAuditPage>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_run(&inner, &run_id)?;
    let entries = engine.command_audit();
    let (start, end, next_cursor) = paginate(entries.len(), query.cursor, query.page_size)?;

    Ok(Json(CommandAuditPage {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        run_id,
        cursor: start,
        next_cursor,
        entries: entries[start..end].to_vec(),
    }))
}
