//! Current batch, history, trends, alerts and status

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::DashboardState;
use crate::api::envelope::{ApiErrorResponse, ApiResponse};
use crate::index::HmpiBand;
use crate::pipeline::ConnectionStatus;
use crate::types::{MetalSample, WaterQualityReading};

/// Default `window_hours` for `/trend`.
const DEFAULT_TREND_WINDOW_HOURS: u32 = 24;

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub connection: ConnectionStatus,
    pub uptime_seconds: u64,
}

/// GET /health
pub async fn health_check(State(state): State<DashboardState>) -> Json<HealthResponse> {
    let monitor = state.monitor.read().await;
    Json(HealthResponse {
        status: "ok",
        connection: monitor.status,
        uptime_seconds: monitor.uptime_secs(),
    })
}

// ============================================================================
// Real-time
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RealtimeResponse {
    pub source: Option<String>,
    pub synthetic: bool,
    pub status: ConnectionStatus,
    pub readings: Vec<LocationReading>,
}

#[derive(Debug, Serialize)]
pub struct LocationReading {
    #[serde(flatten)]
    pub reading: WaterQualityReading,
    pub band: HmpiBand,
}

/// GET /api/v1/realtime
pub async fn get_realtime(State(state): State<DashboardState>) -> Response {
    let monitor = state.monitor.read().await;
    let readings = monitor
        .store
        .current()
        .iter()
        .map(|r| LocationReading {
            band: r.band(),
            reading: r.clone(),
        })
        .collect();

    ApiResponse::ok_with_provenance(
        RealtimeResponse {
            source: monitor.current_source.clone(),
            synthetic: monitor.current_synthetic,
            status: monitor.status,
            readings,
        },
        monitor.current_synthetic,
    )
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub location: Option<String>,
}

/// GET /api/v1/history?location=
pub async fn get_history(
    State(state): State<DashboardState>,
    Query(params): Query<HistoryQuery>,
) -> Response {
    let monitor = state.monitor.read().await;
    let readings = monitor.store.query(params.location.as_deref());
    let simulated = readings.iter().any(|r| r.synthetic);
    ApiResponse::ok_with_provenance(readings, simulated)
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub metal: Option<String>,
    pub window_hours: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TrendResponse {
    pub metal: String,
    pub window_hours: u32,
    pub samples: Vec<MetalSample>,
}

/// GET /api/v1/trend?metal=&window_hours=
pub async fn get_trend(
    State(state): State<DashboardState>,
    Query(params): Query<TrendQuery>,
) -> Response {
    let Some(metal) = params.metal.filter(|m| !m.trim().is_empty()) else {
        return ApiErrorResponse::bad_request("query parameter 'metal' is required");
    };
    let window_hours = params.window_hours.unwrap_or(DEFAULT_TREND_WINDOW_HOURS);

    let monitor = state.monitor.read().await;
    let samples = monitor.store.trend(&metal, window_hours);
    let simulated = samples.iter().any(|s| s.synthetic);
    ApiResponse::ok_with_provenance(
        TrendResponse {
            metal,
            window_hours,
            samples,
        },
        simulated,
    )
}

// ============================================================================
// Alerts
// ============================================================================

/// GET /api/v1/alerts
pub async fn get_alerts(State(state): State<DashboardState>) -> Response {
    let monitor = state.monitor.read().await;
    ApiResponse::ok(monitor.alerts.to_vec())
}

/// POST /api/v1/alerts/:id/acknowledge
pub async fn acknowledge_alert(
    State(state): State<DashboardState>,
    Path(id): Path<String>,
) -> Response {
    let mut monitor = state.monitor.write().await;
    if monitor.alerts.acknowledge(&id) {
        tracing::info!(alert_id = %id, "Alert acknowledged");
        ApiResponse::ok(serde_json::json!({
            "id": id,
            "acknowledged": true,
            "unacknowledged": monitor.alerts.unacknowledged_count(),
        }))
    } else {
        ApiErrorResponse::not_found(format!("alert {id} not found"))
    }
}

// ============================================================================
// Status
// ============================================================================

/// GET /api/v1/status
pub async fn get_status(State(state): State<DashboardState>) -> Response {
    let monitor = state.monitor.read().await;
    ApiResponse::ok(monitor.snapshot())
}
