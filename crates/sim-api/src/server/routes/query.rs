async fn get_status(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RunStatus>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_run(&inner, &run_id)?;
    Ok(Json(engine.status()))
}

#[derive(Debug, Serialize)]
struct RunIndexResponse {
    schema_version: String,
    runs: Vec<PersistedRunSummary>,
}

async fn list_runs(
    State(state): State<AppState>,
) -> Result<Json<RunIndexResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = inner.engine.as_ref().ok_or_else(|| {
        HttpApiError::invalid_query(
            "no active run: create a run before listing stored runs",
            None,
        )
    })?;
    let runs = engine.list_runs().map_err(HttpApiError::from_persistence)?;
    Ok(Json(RunIndexResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        runs,
    }))
}

#[derive(Debug, Serialize)]
struct LeaderboardResponse {
    schema_version: String,
    run_id: String,
    status: RunStatus,
    entries: Vec<LeaderboardEntry>,
}

async fn get_leaderboard(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LeaderboardResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_run(&inner, &run_id)?;
    Ok(Json(LeaderboardResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        run_id,
        status: engine.status(),
        entries: engine.leaderboard(),
    }))
}

async fn get_team_state(
    Path((run_id, team_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<QueryResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_run(&inner, &run_id)?;
    let team_state = engine
        .team_state(&team_id)
        .map_err(|err| HttpApiError::from_run_error(&err))?;
    let data = serde_json::to_value(team_state)
        .map_err(|err| HttpApiError::internal("state serialization failed", Some(err.to_string())))?;
    Ok(Json(QueryResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        query_type: "team_state".to_string(),
        run_id,
        generated_at_round: team_state.round,
        data,
    }))
}

#[derive(Debug, Deserialize)]
struct TimelineQuery {
    from_round: Option<u32>,
    to_round: Option<u32>,
    cursor: Option<usize>,
    page_size: Option<usize>,
}

async fn get_timeline(
    Path((run_id, team_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<QueryResponse>, HttpApiError> {
    let from_round = query.from_round.unwrap_or(1);
    let to_round = query.to_round.unwrap_or(u32::MAX);
    if from_round > to_round {
        return Err(HttpApiError::invalid_query(
            "from_round must not exceed to_round",
            Some(format!("from_round={from_round} to_round={to_round}")),
        ));
    }

    let inner = state.inner.lock().await;
    let engine = require_run(&inner, &run_id)?;
    let team_state = engine
        .team_state(&team_id)
        .map_err(|err| HttpApiError::from_run_error(&err))?;

    // Events and narrative interleave per round; events sort first within a round.
    let mut timeline: Vec<(u32, u8, serde_json::Value)> = Vec::new();
    for event in &team_state.event_history {
        if event.round >= from_round && event.round <= to_round {
            timeline.push((event.round, 0, json!({ "kind": "event", "event": event })));
        }
    }
    for entry in &team_state.narrative_history {
        if entry.round >= from_round && entry.round <= to_round {
            timeline.push((entry.round, 1, json!({ "kind": "narrative", "entry": entry })));
        }
    }
    timeline.sort_by_key(|(round, rank, _)| (*round, *rank));

    let (start, end, next_cursor) = paginate(timeline.len(), query.cursor, query.page_size)?;
    let page: Vec<serde_json::Value> = timeline[start..end]
        .iter()
        .map(|(_, _, value)| value.clone())
        .collect();

    Ok(Json(QueryResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        query_type: "timeline".to_string(),
        run_id,
        generated_at_round: team_state.round,
        data: json!({
            "team_id": team_id,
            "from_round": from_round,
            "cursor": start,
            "next_cursor": next_cursor,
            "total": timeline.len(),
            "entries": page,
        }),
    }))
}

async fn get_team_report(
    Path((run_id, team_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<QueryResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_run(&inner, &run_id)?;
    let team_state = engine
        .team_state(&team_id)
        .map_err(|err| HttpApiError::from_run_error(&err))?;
    Ok(Json(QueryResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        query_type: "team_report".to_string(),
        run_id,
        generated_at_round: team_state.round,
        data: json!({
            "team_id": team_id,
            "board_memo": report::board_memo(team_state),
            "lessons_learned": report::lessons_learned(team_state),
            "scorecard": team_state.scorecard,
        }),
    }))
}

async fn get_export(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RunExport>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_run(&inner, &run_id)?;
    Ok(Json(engine.export_replay()))
}
