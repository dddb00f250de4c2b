//! API response and query types.

use serde::{Deserialize, Serialize};

use crate::config::ScenarioConfig;
use crate::sim::kpi::KpiReport;
use crate::sim::types::StepResult;

/// Combined state response: config, KPIs, and latest telemetry record.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    /// Scenario configuration.
    pub config: ScenarioConfig,
    /// Aggregate KPI report.
    pub kpi: KpiReport,
    /// Most recent telemetry record, absent before any tick ran.
    pub latest_step: Option<TelemetryRecord>,
}

/// One tick as exposed by the API, with grid powers in kW.
#[derive(Debug, Serialize)]
pub struct TelemetryRecord {
    pub timestep: usize,
    /// Simulated time in seconds.
    pub time_s: f64,
    pub supply_kw: f64,
    pub demand_kw: f64,
    /// Storage power (kW; positive = charging).
    pub storage_kw: f64,
    /// `demand - supply + storage` (kW).
    pub difference_kw: f64,
    pub satisfaction: f64,
    pub velocity_mps: f64,
    pub generator_force_n: f64,
    /// Friction plus generator losses of the tick.
    pub losses_j: f64,
    pub carts_on_track: usize,
    pub reserve_top: usize,
    pub reserve_bottom: usize,
}

impl From<&StepResult> for TelemetryRecord {
    fn from(r: &StepResult) -> Self {
        Self {
            timestep: r.timestep,
            time_s: r.time_s,
            supply_kw: r.supply_w / 1e3,
            demand_kw: r.demand_w / 1e3,
            storage_kw: r.storage_w / 1e3,
            difference_kw: r.difference_w / 1e3,
            satisfaction: r.satisfaction,
            velocity_mps: r.velocity_mps,
            generator_force_n: r.generator_force_n,
            losses_j: r.friction_loss_j + r.efficiency_loss_j,
            carts_on_track: r.carts_on_track,
            reserve_top: r.reserve_top,
            reserve_bottom: r.reserve_bottom,
        }
    }
}

/// Optional range query parameters for the telemetry endpoint.
#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    /// Start timestep (inclusive).
    pub from: Option<usize>,
    /// End timestep (inclusive).
    pub to: Option<usize>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
