//! Monitoring Pipeline
//!
//! ```text
//! tick (refresh_interval_ms)
//!   → AggregationGateway::fetch_real_time_data   (adapters in order, fallback on exhaustion)
//!   → TimeSeriesStore::append                    (alerts for the new batch only)
//!   → AlertLog::extend                           (newest first, capped)
//!   → InsightSynthesizer::generate_insights      (wholesale regeneration)
//!   → MonitorEvent broadcast
//! ```
//!
//! Overlapping ticks are skipped by an in-flight guard on the poller.

mod poller;
mod state;

pub use poller::{PollOutcome, Poller, SYSTEM_LOCATION};
pub use state::*;
