//! Insights, forecasts and anomalies

use axum::extract::{Query, State};
use axum::response::Response;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::DashboardState;
use crate::analysis::{create_ensemble_forecast, detect_anomalies, get_all_forecasts};
use crate::api::envelope::{ApiErrorResponse, ApiResponse};
use crate::store::network_series;
use crate::types::{AnomalyPoint, DataInsight, ForecastResult, TimePoint};

/// Longest forecast horizon a request may ask for.
pub const MAX_HORIZON_DAYS: u32 = 90;

/// GET /api/v1/insights
pub async fn get_insights(State(state): State<DashboardState>) -> Response {
    let monitor = state.monitor.read().await;
    let insights: Vec<DataInsight> = monitor.insights.clone();
    ApiResponse::ok_with_provenance(insights, monitor.summary.based_on_simulated_data)
}

/// GET /api/v1/insights/summary
pub async fn get_insights_summary(State(state): State<DashboardState>) -> Response {
    let monitor = state.monitor.read().await;
    ApiResponse::ok_with_provenance(
        monitor.summary.clone(),
        monitor.summary.based_on_simulated_data,
    )
}

// ============================================================================
// Forecasts
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub horizon_days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub horizon_days: u32,
    pub history_points: usize,
    pub forecasts: Vec<ForecastResult>,
}

struct ForecastInput {
    series: Vec<TimePoint>,
    horizon: u32,
    simulated: bool,
}

/// Network HMPI series and a horizon, or an error response.
async fn forecast_input(
    state: &DashboardState,
    horizon_days: Option<u32>,
) -> Result<ForecastInput, Response> {
    let horizon = horizon_days.unwrap_or(state.analysis.forecast_horizon_days);
    if horizon == 0 || horizon > MAX_HORIZON_DAYS {
        return Err(ApiErrorResponse::bad_request(format!(
            "horizon_days must be between 1 and {MAX_HORIZON_DAYS}"
        )));
    }
    let monitor = state.monitor.read().await;
    let series = network_series(monitor.store.readings());
    if series.is_empty() {
        return Err(ApiErrorResponse::unprocessable(
            "no readings buffered yet, nothing to project",
        ));
    }
    Ok(ForecastInput {
        series,
        horizon,
        simulated: monitor.store.has_synthetic(),
    })
}

/// GET /api/v1/forecast?horizon_days=
pub async fn get_forecast(
    State(state): State<DashboardState>,
    Query(params): Query<ForecastQuery>,
) -> Response {
    let input = match forecast_input(&state, params.horizon_days).await {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    let forecasts = get_all_forecasts(&input.series, input.horizon, &mut StdRng::from_entropy());
    ApiResponse::ok_with_provenance(
        ForecastResponse {
            horizon_days: input.horizon,
            history_points: input.series.len(),
            forecasts,
        },
        input.simulated,
    )
}

/// GET /api/v1/forecast/ensemble?horizon_days=
pub async fn get_ensemble_forecast(
    State(state): State<DashboardState>,
    Query(params): Query<ForecastQuery>,
) -> Response {
    let input = match forecast_input(&state, params.horizon_days).await {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    let forecasts = get_all_forecasts(&input.series, input.horizon, &mut StdRng::from_entropy());
    match create_ensemble_forecast(&forecasts) {
        Some(ensemble) => ApiResponse::ok_with_provenance(ensemble, input.simulated),
        None => ApiErrorResponse::unprocessable("no projector produced a forecast"),
    }
}

// ============================================================================
// Anomalies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AnomalyQuery {
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AnomalyResponse {
    pub threshold: f64,
    pub series_points: usize,
    pub anomalies: Vec<AnomalyPoint>,
}

/// GET /api/v1/anomalies?threshold=
pub async fn get_anomalies(
    State(state): State<DashboardState>,
    Query(params): Query<AnomalyQuery>,
) -> Response {
    let threshold = params.threshold.unwrap_or(state.analysis.anomaly_threshold);
    if !threshold.is_finite() || threshold <= 0.0 {
        return ApiErrorResponse::bad_request("threshold must be a positive number");
    }
    let monitor = state.monitor.read().await;
    let series = network_series(monitor.store.readings());
    ApiResponse::ok_with_provenance(
        AnomalyResponse {
            threshold,
            series_points: series.len(),
            anomalies: detect_anomalies(&series, threshold),
        },
        monitor.store.has_synthetic(),
    )
}
