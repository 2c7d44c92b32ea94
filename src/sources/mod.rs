//! Source adapters for upstream air/water-quality providers.
//!
//! Each provider gets one small [`SourceAdapter`] implementation:
//! - `fetch()` talks to the upstream and returns its raw JSON
//! - `normalize()` converts that JSON into canonical readings
//! - `label()` is the provenance string attached to every result
//!
//! Provider scale conversions live in [`scale`] as pure functions. Adapters
//! never let an error escape: [`SourceAdapter::fetch_readings`] folds every
//! failure into a [`FetchResult`] so the gateway can move on.

pub mod backup;
pub mod fallback;
pub mod http;
pub mod openaq;
pub mod safar;
pub mod scale;
pub mod waqi;

pub use backup::BackupAdapter;
pub use fallback::FallbackGenerator;
pub use openaq::OpenAqAdapter;
pub use safar::SafarAdapter;
pub use waqi::WaqiAdapter;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SourcesConfig;
use crate::index::MetalLimits;
use crate::types::WaterQualityReading;

/// Raw upstream JSON, handed from `fetch` to `normalize` unchanged.
pub type RawPayload = serde_json::Value;

/// Adapter-level failures. None of these escape the adapter boundary.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("Unexpected payload: {0}")]
    Parse(String),
    #[error("{0} API key not configured")]
    MissingApiKey(&'static str),
    #[error("{0} returned no usable readings")]
    NoData(String),
    #[error("Upstream request timed out")]
    Timeout,
}

impl SourceError {
    /// Upstream status code, when the failure carried one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            SourceError::UpstreamStatus { status, .. } => Some(*status),
            SourceError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Parse(e.to_string())
    }
}

/// Outcome of one fetch attempt, adapter or gateway level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub success: bool,
    pub data: Vec<WaterQualityReading>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True when `data` came from the fallback generator.
    #[serde(default)]
    pub synthetic: bool,
}

impl FetchResult {
    pub fn ok(source: impl Into<String>, data: Vec<WaterQualityReading>) -> Self {
        let synthetic = !data.is_empty() && data.iter().all(|r| r.synthetic);
        Self {
            success: true,
            data,
            source: source.into(),
            error: None,
            synthetic,
        }
    }

    pub fn failed(source: impl Into<String>, error: impl ToString) -> Self {
        Self {
            success: false,
            data: Vec::new(),
            source: source.into(),
            error: Some(error.to_string()),
            synthetic: false,
        }
    }

    /// Successful and carrying at least one reading.
    pub fn has_data(&self) -> bool {
        self.success && !self.data.is_empty()
    }
}

/// One upstream provider.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Human-readable provenance label (e.g. "WAQI").
    fn label(&self) -> &str;

    /// Fetch the raw upstream payload.
    async fn fetch(&self) -> Result<RawPayload, SourceError>;

    /// Convert a raw payload into canonical readings.
    fn normalize(&self, raw: RawPayload) -> Result<Vec<WaterQualityReading>, SourceError>;

    /// Fetch and normalize, folding every failure into the result.
    async fn fetch_readings(&self) -> FetchResult {
        let label = self.label().to_string();
        let outcome = match self.fetch().await {
            Ok(raw) => self.normalize(raw),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(readings) if readings.is_empty() => {
                let err = SourceError::NoData(label.clone());
                warn!(source = %label, "Adapter returned no readings");
                FetchResult::failed(label, err)
            }
            Ok(readings) => {
                debug!(source = %label, readings = readings.len(), "Adapter fetch succeeded");
                FetchResult::ok(label, readings)
            }
            Err(e) => {
                warn!(source = %label, error = %e, "Adapter fetch failed");
                FetchResult::failed(label, e)
            }
        }
    }
}

/// Build the configured adapters in priority order: WAQI, SAFAR, OpenAQ, then
/// the backup API when one is configured.
pub fn build_adapters(
    config: &SourcesConfig,
    client: reqwest::Client,
    limits: &MetalLimits,
) -> Vec<Arc<dyn SourceAdapter>> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(WaqiAdapter::new(
            client.clone(),
            &config.waqi_base_url,
            config.waqi_api_key.clone(),
            config.cities.clone(),
            limits.clone(),
        )),
        Arc::new(SafarAdapter::new(
            client.clone(),
            &config.safar_base_url,
            config.cities.clone(),
            limits.clone(),
        )),
        Arc::new(OpenAqAdapter::new(
            client.clone(),
            &config.openaq_base_url,
            &config.openaq_country,
            config.openaq_limit,
            limits.clone(),
        )),
    ];
    if let Some(url) = &config.backup_api_url {
        adapters.push(Arc::new(BackupAdapter::new(client, url, limits.clone())));
    }
    adapters
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyAdapter;

    #[async_trait]
    impl SourceAdapter for EmptyAdapter {
        fn label(&self) -> &str {
            "Empty"
        }
        async fn fetch(&self) -> Result<RawPayload, SourceError> {
            Ok(serde_json::json!([]))
        }
        fn normalize(&self, _raw: RawPayload) -> Result<Vec<WaterQualityReading>, SourceError> {
            Ok(Vec::new())
        }
    }

    struct BrokenAdapter;

    #[async_trait]
    impl SourceAdapter for BrokenAdapter {
        fn label(&self) -> &str {
            "Broken"
        }
        async fn fetch(&self) -> Result<RawPayload, SourceError> {
            Err(SourceError::UpstreamStatus {
                status: 503,
                body: "maintenance".to_string(),
            })
        }
        fn normalize(&self, _raw: RawPayload) -> Result<Vec<WaterQualityReading>, SourceError> {
            unreachable!("normalize must not run after a failed fetch")
        }
    }

    #[tokio::test]
    async fn test_empty_result_is_a_failure() {
        let result = EmptyAdapter.fetch_readings().await;
        assert!(!result.success);
        assert_eq!(result.source, "Empty");
        assert!(result.error.unwrap().contains("no usable readings"));
    }

    #[tokio::test]
    async fn test_upstream_status_in_error_message() {
        let result = BrokenAdapter.fetch_readings().await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("503"));
    }

    #[test]
    fn test_build_adapters_priority_order() {
        let mut config = SourcesConfig::default();
        let limits = MetalLimits::default();
        let labels: Vec<String> = build_adapters(&config, reqwest::Client::new(), &limits)
            .iter()
            .map(|a| a.label().to_string())
            .collect();
        assert_eq!(labels, ["WAQI", "SAFAR", "OpenAQ"]);

        config.backup_api_url = Some("http://backup.local".to_string());
        let adapters = build_adapters(&config, reqwest::Client::new(), &limits);
        assert_eq!(adapters.len(), 4);
        assert_eq!(adapters[3].label(), "Backup API");
    }
}
