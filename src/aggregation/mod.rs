//! Aggregation Gateway
//!
//! Tries source adapters in priority order and returns the first one that
//! succeeds with data. When every adapter fails, the fallback generator
//! synthesizes readings (if enabled), so the caller normally always gets a
//! successful result. The synthetic path is never silent: the result's
//! `source` is the fallback label and `synthetic` is set.
//!
//! No retries happen here; the poller's next tick is the retry.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::sources::{FallbackGenerator, FetchResult, SourceAdapter};

/// Source label used when no adapter is configured and fallback is off.
const NO_SOURCE_LABEL: &str = "none";

pub struct AggregationGateway {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    fallback: Option<FallbackGenerator>,
}

impl AggregationGateway {
    /// `adapters` are tried in the given order. `fallback = None` disables
    /// synthetic data entirely.
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, fallback: Option<FallbackGenerator>) -> Self {
        Self { adapters, fallback }
    }

    pub fn adapters(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.adapters
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback.is_some()
    }

    /// Fetch the current batch.
    ///
    /// Returns the first adapter result with non-empty data. Later adapters
    /// are not invoked. On total exhaustion returns synthetic data, or a
    /// failed result carrying the last adapter error when fallback is off.
    pub async fn fetch_real_time_data(&self) -> FetchResult {
        let mut last_failure: Option<FetchResult> = None;

        for adapter in &self.adapters {
            let result = adapter.fetch_readings().await;
            if result.has_data() {
                info!(
                    source = %result.source,
                    readings = result.data.len(),
                    "Aggregated readings"
                );
                return result;
            }
            last_failure = Some(result);
        }

        match &self.fallback {
            Some(generator) => {
                warn!(
                    exhausted = self.adapters.len(),
                    "All sources failed, using synthetic fallback data"
                );
                FetchResult::ok(generator.label(), generator.generate(Utc::now()))
            }
            None => {
                warn!(
                    exhausted = self.adapters.len(),
                    "All sources failed and fallback is disabled"
                );
                last_failure.unwrap_or_else(|| {
                    FetchResult::failed(NO_SOURCE_LABEL, "no data sources configured")
                })
            }
        }
    }
}
