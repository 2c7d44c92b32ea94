//! API route handlers
//!
//! - `realtime`: current batch, history, metal trends, alerts, status
//! - `insights`: insights, summary, forecasts, anomalies
//! - `proxy`: pass-through proxies to the upstream providers
//! - `metrics`: Prometheus text exposition

mod insights;
mod metrics;
mod proxy;
mod realtime;

pub use insights::*;
pub use metrics::*;
pub use proxy::*;
pub use realtime::*;

use std::sync::Arc;

use crate::config::{AnalysisConfig, MonitorConfig};
use crate::index::MetalLimits;
use crate::pipeline::MonitorHandle;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct DashboardState {
    /// Monitor state written by the poller
    pub monitor: MonitorHandle,
    /// Upstream clients for the proxy routes
    pub proxies: Arc<ProxyClients>,
    /// Defaults for forecast horizon and anomaly threshold
    pub analysis: AnalysisConfig,
}

impl DashboardState {
    pub fn new(monitor: MonitorHandle, proxies: ProxyClients, analysis: AnalysisConfig) -> Self {
        Self {
            monitor,
            proxies: Arc::new(proxies),
            analysis,
        }
    }

    /// Build from the full configuration, sharing one HTTP client.
    pub fn from_config(
        monitor: MonitorHandle,
        config: &MonitorConfig,
        client: reqwest::Client,
        limits: &MetalLimits,
    ) -> Self {
        Self::new(
            monitor,
            ProxyClients::from_config(&config.sources, client, limits),
            config.analysis.clone(),
        )
    }
}
