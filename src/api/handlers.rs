//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{ErrorResponse, StateResponse, TelemetryQuery, TelemetryRecord};

/// Returns the scenario, KPI report, and latest telemetry record.
///
/// `GET /state` → 200 + `StateResponse` JSON
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    Json(StateResponse {
        config: state.config.clone(),
        kpi: state.kpi.clone(),
        latest_step: state.results.last().map(TelemetryRecord::from),
    })
}

/// Returns telemetry records, optionally filtered by timestep range.
///
/// `GET /telemetry` → 200 + `Vec<TelemetryRecord>` JSON
/// `GET /telemetry?from=N&to=M` → filtered range (inclusive)
/// `GET /telemetry?from=10&to=5` → 400 + `ErrorResponse`
pub async fn get_telemetry(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TelemetryQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(usize::MAX);

    if from > to {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("`from` ({from}) must be <= `to` ({to})"),
            }),
        ));
    }

    let records: Vec<TelemetryRecord> = state
        .results
        .iter()
        .filter(|r| r.timestep >= from && r.timestep <= to)
        .map(TelemetryRecord::from)
        .collect();

    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::config::ScenarioConfig;
    use crate::sim::kpi::KpiReport;
    use crate::sim::types::StepResult;

    fn make_test_state(steps: usize) -> Arc<AppState> {
        let results: Vec<StepResult> = (0..steps)
            .map(|t| StepResult {
                timestep: t,
                time_s: t as f64 * 10.0,
                supply_w: 4.0e5,
                demand_w: 3.0e5,
                storage_w: 1.0e5,
                difference_w: 0.0,
                satisfaction: 1.0,
                velocity_mps: 0.7,
                generator_force_n: 1.45e5,
                friction_loss_j: 1.0e4,
                efficiency_loss_j: 1.0e5,
                carts_on_track: 1,
                reserve_top: 500,
                reserve_bottom: 499,
            })
            .collect();
        let kpi = KpiReport::from_results(&results, 10.0, 0.0);
        Arc::new(AppState {
            config: ScenarioConfig::baseline(),
            kpi,
            results,
        })
    }

    async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn state_returns_200() {
        let (status, json) = get_json(make_test_state(24), "/state").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.get("config").is_some());
        assert!(json.get("kpi").is_some());
        assert_eq!(json["latest_step"]["timestep"], 23);
        assert_eq!(json["config"]["supply"]["model"], "synthetic");
    }

    #[tokio::test]
    async fn state_without_results_has_null_latest() {
        let (status, json) = get_json(make_test_state(0), "/state").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["latest_step"].is_null());
    }

    #[tokio::test]
    async fn telemetry_returns_all_steps() {
        let (status, json) = get_json(make_test_state(24), "/telemetry").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(24));
    }

    #[tokio::test]
    async fn telemetry_range_query() {
        let (status, json) = get_json(make_test_state(24), "/telemetry?from=5&to=10").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(6)); // timesteps 5..=10
        assert_eq!(json[0]["timestep"], 5);
        assert_eq!(json[5]["timestep"], 10);
        assert_eq!(json[0]["storage_kw"], 100.0);
    }

    #[tokio::test]
    async fn telemetry_invalid_range_returns_400() {
        let (status, json) = get_json(make_test_state(24), "/telemetry?from=10&to=5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }
}
