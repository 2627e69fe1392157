// ── Query interface ──
//
//   GET       /ip      access point → device IPs (JSON)
//   GET       /ipset   ipset membership commands (text)
//   GET|POST  /reload  re-read the configuration file
//   GET       /status  snapshot rounds and per-controller poll health

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use assocmap_config::{ConfigError, acl_rules, ipset_config};
use assocmap_core::{KindSummary, PollStatus, RecordKind, ipset_commands};

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ip", get(associations_handler))
        .route("/ipset", get(ipset_handler))
        .route("/reload", get(reload_handler).post(reload_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

/// Serve until `shutdown` is cancelled, letting in-flight requests finish.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn associations_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store().associations())
}

async fn ipset_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.config();
    let join = state.store().read(RecordKind::Join);

    match ipset_commands(&join.entries, &acl_rules(&config), &ipset_config(&config)) {
        Ok(commands) => {
            debug!(commands = commands.len(), round = join.round, "rendering ipset commands");
            let body: String = commands.iter().map(|c| format!("{c}\n")).collect();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                body,
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "ipset generation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}\n")).into_response()
        }
    }
}

async fn reload_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.reload().await {
        Ok(_) => (StatusCode::OK, "config reloaded.".to_owned()),
        Err(e @ ConfigError::Validation { .. }) => {
            (StatusCode::UNPROCESSABLE_ENTITY, format!("{e}\n"))
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}\n")),
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    config: String,
    data_age_secs: Option<i64>,
    snapshots: Vec<KindSummary>,
    controllers: Vec<PollStatus>,
}

async fn status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatusReport {
        config: state.config_path().display().to_string(),
        data_age_secs: state.store().data_age().map(|age| age.num_seconds()),
        snapshots: state.store().summary(),
        controllers: state.health().snapshot(),
    })
}
