//! HMPI Monitor: heavy-metal pollution monitoring service
//!
//! Aggregates air/water-quality readings from several upstream providers,
//! normalizes them onto the Heavy Metal Pollution Index, keeps a bounded
//! history and turns it into statistics, forecasts and ranked insights.
//!
//! ## Architecture
//!
//! - **Sources**: one adapter per provider (WAQI, SAFAR, OpenAQ, backup) plus a synthetic fallback
//! - **Aggregation**: priority-ordered gateway, first adapter with data wins
//! - **Index**: HMPI computation, metal classification, unit normalization
//! - **Store**: rolling reading buffer and alert log
//! - **Analysis**: trends, volatility, seasonality, correlation, anomalies, projectors
//! - **Insights**: rule-based synthesis, recommendations and summary
//! - **Pipeline**: shared monitor state and the polling loop
//! - **API**: axum dashboard routes and upstream proxies

pub mod aggregation;
pub mod analysis;
pub mod api;
pub mod config;
pub mod fixtures;
pub mod index;
pub mod insights;
pub mod pipeline;
pub mod sources;
pub mod store;
pub mod types;

// Re-export configuration
pub use config::MonitorConfig;

// Re-export commonly used types
pub use types::{
    Alert, AlertSeverity, AlertType, AnomalyPoint, DataInsight, EnsembleForecast,
    ForecastResult, InsightsSummary, MetalReading, MetalStatus, TimePoint, WaterQualityReading,
};

pub use aggregation::AggregationGateway;
pub use index::{compute_hmpi, HmpiBand, MetalLimits};
pub use insights::InsightSynthesizer;
pub use pipeline::{MonitorHandle, MonitorState, Poller};
pub use sources::{FetchResult, SourceAdapter, SourceError};
pub use store::TimeSeriesStore;
