//! Backup API adapter.
//!
//! The backup service already serves canonical readings at
//! `GET {backup}/readings`, either wrapped as `{"data": [...]}` or as a bare
//! array. Units are normalized to μg/L and status/HMPI recomputed locally so
//! the upstream's own classification is never trusted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use super::http::{get_json, join_url};
use super::{RawPayload, SourceAdapter, SourceError};
use crate::index::{compute_hmpi, to_micrograms_per_litre, MetalLimits};
use crate::types::{MetalReading, WaterParameters, WaterQualityReading, CANONICAL_UNIT};

pub const LABEL: &str = "Backup API";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BackupPayload {
    Wrapped { data: Vec<BackupReading> },
    Bare(Vec<BackupReading>),
}

#[derive(Debug, Deserialize)]
struct BackupReading {
    location: String,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    metals: Vec<BackupMetal>,
    #[serde(default)]
    parameters: WaterParameters,
}

#[derive(Debug, Deserialize)]
struct BackupMetal {
    metal: String,
    value: f64,
    #[serde(default = "default_unit")]
    unit: String,
}

fn default_unit() -> String {
    CANONICAL_UNIT.to_string()
}

pub struct BackupAdapter {
    client: reqwest::Client,
    base_url: String,
    limits: MetalLimits,
}

impl BackupAdapter {
    pub fn new(client: reqwest::Client, base_url: &str, limits: MetalLimits) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            limits,
        }
    }
}

#[async_trait]
impl SourceAdapter for BackupAdapter {
    fn label(&self) -> &str {
        LABEL
    }

    async fn fetch(&self) -> Result<RawPayload, SourceError> {
        get_json(&self.client, &join_url(&self.base_url, "readings"), &[]).await
    }

    fn normalize(&self, raw: RawPayload) -> Result<Vec<WaterQualityReading>, SourceError> {
        normalize_backup(raw, &self.limits)
    }
}

/// Convert a backup payload into canonical readings.
///
/// Metals in an unknown unit are dropped (and so excluded from HMPI).
pub fn normalize_backup(
    raw: RawPayload,
    limits: &MetalLimits,
) -> Result<Vec<WaterQualityReading>, SourceError> {
    let payload: BackupPayload = serde_json::from_value(raw)?;
    let rows = match payload {
        BackupPayload::Wrapped { data } => data,
        BackupPayload::Bare(rows) => rows,
    };

    Ok(rows
        .into_iter()
        .map(|row| {
            let metals: Vec<MetalReading> = row
                .metals
                .into_iter()
                .filter_map(|m| match to_micrograms_per_litre(m.value, &m.unit) {
                    Some(value) => Some(MetalReading::new(&m.metal, value, limits)),
                    None => {
                        warn!(
                            source = LABEL,
                            metal = %m.metal,
                            unit = %m.unit,
                            "Dropping metal with unknown unit"
                        );
                        None
                    }
                })
                .collect();
            WaterQualityReading {
                hmpi: compute_hmpi(&metals, limits),
                location: row.location,
                latitude: row.latitude,
                longitude: row.longitude,
                timestamp: row.timestamp.unwrap_or_else(Utc::now),
                metals,
                parameters: row.parameters,
                source: LABEL.to_string(),
                synthetic: false,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetalStatus;
    use serde_json::json;

    #[test]
    fn test_wrapped_payload_with_unit_conversion() {
        let raw = json!({
            "data": [{
                "location": "Yamuna River, Delhi",
                "timestamp": "2024-05-01T00:00:00Z",
                "metals": [
                    { "metal": "Lead", "value": 0.02, "unit": "mg/L", "status": "normal" },
                    { "metal": "Cadmium", "value": 1.5, "unit": "μg/L" },
                    { "metal": "Arsenic", "value": 3.0, "unit": "grains" }
                ],
                "parameters": { "ph": 7.4, "dissolvedOxygen": 5.1 }
            }]
        });
        let readings = normalize_backup(raw, &MetalLimits::default()).unwrap();
        assert_eq!(readings.len(), 1);

        let r = &readings[0];
        assert_eq!(r.metals.len(), 2, "unknown unit dropped");
        let lead = r.metal("lead").unwrap();
        assert!((lead.value - 20.0).abs() < 1e-9);
        assert_eq!(lead.unit, "μg/L");
        // upstream said normal; 2× the limit is critical
        assert_eq!(lead.status, MetalStatus::Critical);
        // (200 + 50) / 2
        assert!((r.hmpi - 125.0).abs() < 1e-9);
        assert_eq!(r.parameters.dissolved_oxygen, Some(5.1));
        assert_eq!(r.source, "Backup API");
    }

    #[test]
    fn test_bare_array_payload() {
        let raw = json!([{ "location": "Site A", "metals": [] }]);
        let readings = normalize_backup(raw, &MetalLimits::default()).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].hmpi, 0.0);
    }

    #[test]
    fn test_garbage_payload_is_parse_error() {
        let err = normalize_backup(json!("nope"), &MetalLimits::default()).unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
