use std::fmt;
use std::net::SocketAddr;

use axum::extract::{Path, Query, Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::Method;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use contracts::{
    ApiError, Command, CommandResult, ErrorCode, EventType, LeaderboardEntry, QueryResponse,
    RoleDecision, RunExport, RunStatus, ScenarioConfig, Severity, TeamSummary, SCHEMA_VERSION_V1,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::persistence::PersistedRunSummary;
use crate::{EngineApi, PersistenceError};
use sim_core::report;
use sim_core::run::{ReplayError, RunError, RunSetup};

const DEFAULT_PAGE_SIZE: usize = 200;
const MAX_PAGE_SIZE: usize = 2000;
const DEFAULT_SQLITE_PATH: &str = "sim_runs.sqlite";

include!("error.rs");
include!("state.rs");
include!("routes/control.rs");
include!("routes/query.rs");
include!("util.rs");

pub async fn serve(addr: SocketAddr) -> Result<(), ServerError> {
    let state = AppState::new();
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/runs", post(create_run).get(list_runs))
        .route("/api/v1/runs/import", post(import_run))
        .route("/api/v1/runs/{run_id}/start", post(start_run))
        .route("/api/v1/runs/{run_id}/pause", post(pause_run))
        .route("/api/v1/runs/{run_id}/resume", post(resume_run))
        .route("/api/v1/runs/{run_id}/status", get(get_status))
        .route(
            "/api/v1/runs/{run_id}/commands",
            post(submit_command).get(get_commands),
        )
        .route("/api/v1/runs/{run_id}/teams", post(add_team))
        .route(
            "/api/v1/runs/{run_id}/teams/{team_id}",
            delete(remove_team),
        )
        .route(
            "/api/v1/runs/{run_id}/teams/{team_id}/decisions",
            post(submit_decisions),
        )
        .route(
            "/api/v1/runs/{run_id}/teams/{team_id}/advance",
            post(advance_team),
        )
        .route("/api/v1/runs/{run_id}/advance_all", post(advance_all))
        .route(
            "/api/v1/runs/{run_id}/teams/{team_id}/events",
            post(inject_event),
        )
        .route("/api/v1/runs/{run_id}/leaderboard", get(get_leaderboard))
        .route(
            "/api/v1/runs/{run_id}/teams/{team_id}/state",
            get(get_team_state),
        )
        .route(
            "/api/v1/runs/{run_id}/teams/{team_id}/timeline",
            get(get_timeline),
        )
        .route(
            "/api/v1/runs/{run_id}/teams/{team_id}/report",
            get(get_team_report),
        )
        .route("/api/v1/runs/{run_id}/export", get(get_export))
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}

async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = Response::new(axum::body::Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

#[cfg(test)]
mod tests;
