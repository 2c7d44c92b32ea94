//! OpenAQ measurements adapter.
//!
//! `GET {base}/v2/measurements?country={code}&limit={n}`. Measurements are
//! grouped by location; PM2.5 drives the HMPI conversion, PM10 is the
//! fallback when a location reports no PM2.5.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::http::{get_json, join_url};
use super::scale::{pm10_to_hmpi, pm25_to_hmpi, POLLUTANT_DRIVERS};
use super::{RawPayload, SourceAdapter, SourceError};
use crate::index::{apportion_metals, MetalLimits};
use crate::types::{WaterParameters, WaterQualityReading};

pub const LABEL: &str = "OpenAQ";

#[derive(Debug, Deserialize)]
struct MeasurementsResponse {
    results: Vec<Measurement>,
}

#[derive(Debug, Deserialize)]
struct Measurement {
    location: String,
    parameter: String,
    value: f64,
    #[serde(default)]
    date: Option<MeasurementDate>,
    #[serde(default)]
    coordinates: Option<Coordinates>,
}

#[derive(Debug, Deserialize)]
struct MeasurementDate {
    utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Coordinates {
    latitude: f64,
    longitude: f64,
}

/// Latest value per parameter for one location.
#[derive(Default)]
struct LocationGroup {
    latest: BTreeMap<String, (Option<DateTime<Utc>>, f64)>,
    newest: Option<DateTime<Utc>>,
    coordinates: Option<Coordinates>,
}

impl LocationGroup {
    fn add(&mut self, m: Measurement) {
        let at = m.date.map(|d| d.utc);
        let key = m.parameter.to_ascii_lowercase();
        let replace = match self.latest.get(&key) {
            Some((existing, _)) => at > *existing,
            None => true,
        };
        if replace && m.value.is_finite() && m.value >= 0.0 {
            self.latest.insert(key, (at, m.value));
        }
        if at > self.newest {
            self.newest = at;
        }
        if self.coordinates.is_none() {
            self.coordinates = m.coordinates;
        }
    }

    fn value(&self, parameter: &str) -> Option<f64> {
        self.latest.get(parameter).map(|(_, v)| *v)
    }
}

pub struct OpenAqAdapter {
    client: reqwest::Client,
    base_url: String,
    country: String,
    limit: u32,
    limits: MetalLimits,
}

impl OpenAqAdapter {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        country: &str,
        limit: u32,
        limits: MetalLimits,
    ) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            country: country.to_string(),
            limit,
            limits,
        }
    }

    /// Raw measurement list, passed through unchanged.
    pub async fn fetch_measurements(
        &self,
        country: &str,
        limit: u32,
    ) -> Result<serde_json::Value, SourceError> {
        let url = join_url(&self.base_url, "v2/measurements");
        let limit = limit.to_string();
        get_json(&self.client, &url, &[("country", country), ("limit", &limit)]).await
    }

    pub fn default_country(&self) -> &str {
        &self.country
    }

    pub fn default_limit(&self) -> u32 {
        self.limit
    }
}

#[async_trait]
impl SourceAdapter for OpenAqAdapter {
    fn label(&self) -> &str {
        LABEL
    }

    async fn fetch(&self) -> Result<RawPayload, SourceError> {
        self.fetch_measurements(&self.country, self.limit).await
    }

    fn normalize(&self, raw: RawPayload) -> Result<Vec<WaterQualityReading>, SourceError> {
        normalize_measurements(raw, &self.limits)
    }
}

/// Group a measurement list by location and convert each group to a reading.
///
/// Locations with neither PM2.5 nor PM10 are skipped. Output is ordered by
/// location name.
pub fn normalize_measurements(
    raw: RawPayload,
    limits: &MetalLimits,
) -> Result<Vec<WaterQualityReading>, SourceError> {
    let response: MeasurementsResponse = serde_json::from_value(raw)?;

    let mut groups: BTreeMap<String, LocationGroup> = BTreeMap::new();
    for m in response.results {
        groups.entry(m.location.clone()).or_default().add(m);
    }

    let readings = groups
        .into_iter()
        .filter_map(|(location, group)| {
            let hmpi = group
                .value("pm25")
                .map(pm25_to_hmpi)
                .or_else(|| group.value("pm10").map(pm10_to_hmpi))?;
            let drivers: Vec<(&str, Option<f64>)> = POLLUTANT_DRIVERS
                .iter()
                .map(|(pollutant, metal)| (*metal, group.value(pollutant)))
                .collect();
            Some(WaterQualityReading {
                location,
                latitude: group.coordinates.map(|c| c.latitude),
                longitude: group.coordinates.map(|c| c.longitude),
                timestamp: group.newest.unwrap_or_else(Utc::now),
                hmpi,
                metals: apportion_metals(hmpi, &drivers, limits),
                parameters: WaterParameters::default(),
                source: LABEL.to_string(),
                synthetic: false,
            })
        })
        .collect();
    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn measurement(location: &str, parameter: &str, value: f64, utc: &str) -> serde_json::Value {
        json!({
            "location": location,
            "parameter": parameter,
            "value": value,
            "unit": "µg/m³",
            "date": { "utc": utc, "local": utc },
            "coordinates": { "latitude": 28.65, "longitude": 77.31 },
            "country": "IN"
        })
    }

    #[test]
    fn test_groups_by_location_with_latest_values() {
        let raw = json!({
            "meta": { "found": 4 },
            "results": [
                measurement("Anand Vihar", "pm25", 90.0, "2024-05-01T08:00:00Z"),
                measurement("Anand Vihar", "pm25", 120.0, "2024-05-01T09:00:00Z"),
                measurement("Anand Vihar", "pm10", 200.0, "2024-05-01T07:00:00Z"),
                measurement("Bandra", "pm10", 80.0, "2024-05-01T06:00:00Z"),
                measurement("Colaba", "o3", 30.0, "2024-05-01T06:00:00Z")
            ]
        });
        let readings = normalize_measurements(raw, &MetalLimits::default()).unwrap();

        assert_eq!(readings.len(), 2, "Colaba has no particulate data");
        let anand = &readings[0];
        assert_eq!(anand.location, "Anand Vihar");
        assert!((anand.hmpi - 100.0).abs() < 1e-9, "latest pm25=120 → 100");
        assert_eq!(anand.timestamp.to_rfc3339(), "2024-05-01T09:00:00+00:00");
        assert_eq!(anand.latitude, Some(28.65));

        let bandra = &readings[1];
        assert!((bandra.hmpi - 40.0).abs() < 1e-9, "pm10 fallback 80 → 40");
    }

    #[test]
    fn test_unexpected_shape_is_parse_error() {
        let err = normalize_measurements(json!({ "oops": true }), &MetalLimits::default())
            .unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
