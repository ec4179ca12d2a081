//! HTTP trigger and in-process schedule loop.
//!
//! The generator is driven externally: a hosted scheduler (or an operator)
//! hits `POST /run` once per day. Deployments without an external scheduler
//! can instead configure a cron expression and let [`cron_loop`] fire the
//! runs in-process. Both paths share the same store handle, and overlapping
//! runs are safe because duplicate cycles surface as conflicts.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use cron::Schedule;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::core::generator;
use crate::storage::LedgerStore;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn LedgerStore>,
}

/// Builds the trigger router around an injected store.
pub fn router(store: Arc<dyn LedgerStore>) -> Router {
    Router::new()
        .route("/run", post(run))
        .route("/healthz", get(healthz))
        .with_state(AppState { store })
}

/// Binds the configured address and serves the trigger until interrupted.
pub async fn serve(config: &ServerConfig, store: Arc<dyn LedgerStore>) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Serving generation trigger");
    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Runs one generation pass over both contact kinds.
///
/// Only a failure listing contacts aborts the run; everything else is
/// reflected in the per-kind counters of the returned report.
async fn run(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let today = Utc::now().date_naive();
    match generator::run(state.store.as_ref(), today).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({ "success": true, "report": report })),
        ),
        Err(e) => {
            error!(%e, "Generation run aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

/// Fires generation runs on a cron cadence until the process exits.
///
/// The expression has already been validated during config parsing; a parse
/// failure here only disables the loop rather than taking the server down.
pub async fn cron_loop(expr: &str, store: Arc<dyn LedgerStore>) {
    let schedule = match Schedule::from_str(expr) {
        Ok(schedule) => schedule,
        Err(e) => {
            error!(%e, "Invalid cron expression, schedule loop disabled");
            return;
        }
    };
    loop {
        let Some(next) = schedule.upcoming(Utc).next() else {
            info!("Cron schedule exhausted, schedule loop stopped");
            return;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        match generator::run(store.as_ref(), Utc::now().date_naive()).await {
            Ok(report) => info!(
                generated = report.generated(),
                "Scheduled generation finished"
            ),
            Err(e) => error!(%e, "Scheduled generation failed"),
        }
    }
}
