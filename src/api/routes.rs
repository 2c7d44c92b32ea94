//! API route definitions
//!
//! - /api/v1/realtime, /history, /trend - current batch and buffered history
//! - /api/v1/alerts - alert log and acknowledgement
//! - /api/v1/insights, /forecast, /anomalies - analysis outputs
//! - /api/v1/status, /metrics - pipeline health
//! - /environmental/* - upstream pass-through proxies
//! - /health - liveness

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, DashboardState};

/// Versioned dashboard API, nested under `/api/v1`.
pub fn api_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/realtime", get(handlers::get_realtime))
        .route("/history", get(handlers::get_history))
        .route("/trend", get(handlers::get_trend))
        // Alerts
        .route("/alerts", get(handlers::get_alerts))
        .route("/alerts/:id/acknowledge", post(handlers::acknowledge_alert))
        // Analysis
        .route("/insights", get(handlers::get_insights))
        .route("/insights/summary", get(handlers::get_insights_summary))
        .route("/forecast", get(handlers::get_forecast))
        .route("/forecast/ensemble", get(handlers::get_ensemble_forecast))
        .route("/anomalies", get(handlers::get_anomalies))
        // Pipeline health
        .route("/status", get(handlers::get_status))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state)
}

/// Upstream proxies, nested under `/environmental`.
pub fn proxy_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/waqi", get(handlers::proxy_waqi))
        .route("/safar", get(handlers::proxy_safar))
        .route("/openaq", get(handlers::proxy_openaq))
        .with_state(state)
}

/// Liveness endpoint at root level
pub fn health_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state)
}
