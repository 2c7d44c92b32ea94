//! Shared data structures for the HMPI monitoring pipeline
//!
//! - Readings: `WaterQualityReading`, `MetalReading` (adapter output)
//! - Alerts: raised by the time-series store on ingestion
//! - Insights: `DataInsight`, `InsightsSummary` (synthesizer output)
//! - Forecasts/anomalies: analyzer outputs

mod alert;
mod forecast;
mod insight;
mod reading;

pub use alert::*;
pub use forecast::*;
pub use insight::*;
pub use reading::*;
