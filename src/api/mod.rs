//! REST API for a finished run.
//!
//! Provides two GET endpoints:
//! - `/state`: scenario config, KPI report, and latest tick
//! - `/telemetry`: per-tick records with optional range filtering

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::config::ScenarioConfig;
use crate::sim::kpi::KpiReport;
use crate::sim::types::StepResult;

pub use types::{StateResponse, TelemetryRecord};

/// Immutable application state shared across all request handlers.
///
/// Constructed once after the simulation run completes and wrapped in
/// `Arc`; all data is read-only so no locks are needed.
pub struct AppState {
    /// Scenario the run was built from.
    pub config: ScenarioConfig,
    /// Aggregate KPI report.
    pub kpi: KpiReport,
    /// Per-tick simulation results.
    pub results: Vec<StepResult>,
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(handlers::get_state))
        .route("/telemetry", get(handlers::get_telemetry))
        .with_state(state)
}

/// Binds to the given address and serves the API until the process exits.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
