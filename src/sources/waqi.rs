//! WAQI (World Air Quality Index) adapter.
//!
//! `GET {base}/feed/{city}/?token={key}` per configured city, issued
//! concurrently. Cities that fail are dropped; the adapter fails only when
//! every city fails.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::http::{get_json, join_url};
use super::scale::{waqi_aqi_to_hmpi, POLLUTANT_DRIVERS};
use super::{RawPayload, SourceAdapter, SourceError};
use crate::index::{apportion_metals, MetalLimits};
use crate::types::{WaterParameters, WaterQualityReading};

pub const LABEL: &str = "WAQI";

#[derive(Debug, Deserialize)]
struct WaqiEnvelope {
    status: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WaqiFeed {
    /// Number, or "-" when the station has no current value.
    aqi: serde_json::Value,
    #[serde(default)]
    city: Option<WaqiCity>,
    #[serde(default)]
    iaqi: HashMap<String, WaqiValue>,
    #[serde(default)]
    time: Option<WaqiTime>,
}

#[derive(Debug, Deserialize)]
struct WaqiCity {
    #[serde(default)]
    geo: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct WaqiValue {
    v: f64,
}

#[derive(Debug, Deserialize)]
struct WaqiTime {
    #[serde(default)]
    iso: Option<String>,
}

pub struct WaqiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cities: Vec<String>,
    limits: MetalLimits,
}

impl WaqiAdapter {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
        cities: Vec<String>,
        limits: MetalLimits,
    ) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            api_key,
            cities,
            limits,
        }
    }

    /// Raw feed for one city, passed through unchanged.
    pub async fn fetch_city(&self, city: &str) -> Result<serde_json::Value, SourceError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::MissingApiKey(LABEL))?;
        let url = join_url(&self.base_url, &format!("feed/{}/", city.trim().to_lowercase()));
        get_json(&self.client, &url, &[("token", key)]).await
    }
}

#[async_trait]
impl SourceAdapter for WaqiAdapter {
    fn label(&self) -> &str {
        LABEL
    }

    async fn fetch(&self) -> Result<RawPayload, SourceError> {
        if self.api_key.is_none() {
            return Err(SourceError::MissingApiKey(LABEL));
        }

        let responses = join_all(self.cities.iter().map(|city| async move {
            (city.as_str(), self.fetch_city(city).await)
        }))
        .await;

        let mut last_error = None;
        let mut feeds = Vec::new();
        for (city, result) in responses {
            match result {
                Ok(body) => feeds.push(json!({ "city": city, "response": body })),
                Err(e) => {
                    warn!(source = LABEL, city, error = %e, "City request failed");
                    last_error = Some(e);
                }
            }
        }

        match (feeds.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(serde_json::Value::Array(feeds)),
        }
    }

    fn normalize(&self, raw: RawPayload) -> Result<Vec<WaterQualityReading>, SourceError> {
        let entries = raw
            .as_array()
            .ok_or_else(|| SourceError::Parse("expected an array of city feeds".to_string()))?;

        let mut readings = Vec::new();
        for entry in entries {
            let city = entry.get("city").and_then(|c| c.as_str()).unwrap_or("Unknown");
            let Some(response) = entry.get("response") else {
                continue;
            };
            match normalize_feed(city, response, &self.limits) {
                Ok(reading) => readings.push(reading),
                Err(e) => warn!(source = LABEL, city, error = %e, "Skipping unusable feed"),
            }
        }
        Ok(readings)
    }
}

/// Convert one WAQI feed response into a reading for `city`.
pub fn normalize_feed(
    city: &str,
    response: &serde_json::Value,
    limits: &MetalLimits,
) -> Result<WaterQualityReading, SourceError> {
    let envelope: WaqiEnvelope = serde_json::from_value(response.clone())?;
    if envelope.status != "ok" {
        let message = envelope.data.as_str().unwrap_or("unknown error").to_string();
        return Err(SourceError::Parse(format!("WAQI status '{}': {message}", envelope.status)));
    }

    let feed: WaqiFeed = serde_json::from_value(envelope.data)?;
    let aqi = feed
        .aqi
        .as_f64()
        .or_else(|| feed.aqi.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| SourceError::NoData(format!("{LABEL} {city}")))?;

    let hmpi = waqi_aqi_to_hmpi(aqi);
    let drivers: Vec<(&str, Option<f64>)> = POLLUTANT_DRIVERS
        .iter()
        .map(|(pollutant, metal)| (*metal, feed.iaqi.get(*pollutant).map(|v| v.v)))
        .collect();
    let metals = apportion_metals(hmpi, &drivers, limits);

    let (latitude, longitude) = match feed.city.as_ref().map(|c| c.geo.as_slice()) {
        Some([lat, lon, ..]) => (Some(*lat), Some(*lon)),
        _ => (None, None),
    };

    let timestamp = feed
        .time
        .and_then(|t| t.iso)
        .and_then(|iso| DateTime::parse_from_rfc3339(&iso).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Ok(WaterQualityReading {
        location: city.to_string(),
        latitude,
        longitude,
        timestamp,
        hmpi,
        metals,
        parameters: WaterParameters {
            temperature: feed.iaqi.get("t").map(|v| v.v),
            ..WaterParameters::default()
        },
        source: LABEL.to_string(),
        synthetic: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::compute_hmpi;

    fn delhi_feed() -> serde_json::Value {
        json!({
            "status": "ok",
            "data": {
                "aqi": 152,
                "city": { "geo": [28.6139, 77.2090], "name": "Delhi" },
                "iaqi": {
                    "pm25": { "v": 152 },
                    "pm10": { "v": 98 },
                    "no2": { "v": 21.4 },
                    "t": { "v": 31.5 }
                },
                "time": { "iso": "2024-05-01T10:00:00+05:30" }
            }
        })
    }

    #[test]
    fn test_normalize_feed() {
        let limits = MetalLimits::default();
        let reading = normalize_feed("Delhi", &delhi_feed(), &limits).unwrap();

        assert_eq!(reading.location, "Delhi");
        assert_eq!(reading.source, "WAQI");
        assert!(!reading.synthetic);
        assert_eq!(reading.latitude, Some(28.6139));
        assert_eq!(reading.parameters.temperature, Some(31.5));
        assert_eq!(reading.timestamp.to_rfc3339(), "2024-05-01T04:30:00+00:00");

        assert!((reading.hmpi - waqi_aqi_to_hmpi(152.0)).abs() < 1e-9);
        assert_eq!(reading.metals.len(), 5);
        assert!((compute_hmpi(&reading.metals, &limits) - reading.hmpi).abs() < 1e-9);
    }

    #[test]
    fn test_error_status_rejected() {
        let body = json!({ "status": "error", "data": "Invalid key" });
        let err = normalize_feed("Delhi", &body, &MetalLimits::default()).unwrap_err();
        assert!(err.to_string().contains("Invalid key"));
    }

    #[test]
    fn test_dash_aqi_is_no_data() {
        let body = json!({ "status": "ok", "data": { "aqi": "-", "iaqi": {} } });
        let err = normalize_feed("Delhi", &body, &MetalLimits::default()).unwrap_err();
        assert!(matches!(err, SourceError::NoData(_)));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let adapter = WaqiAdapter::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            None,
            vec!["Delhi".to_string()],
            MetalLimits::default(),
        );
        let result = adapter.fetch_readings().await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("API key"));
    }

    #[test]
    fn test_normalize_skips_bad_cities() {
        let adapter = WaqiAdapter::new(
            reqwest::Client::new(),
            "http://unused",
            Some("k".to_string()),
            Vec::new(),
            MetalLimits::default(),
        );
        let raw = json!([
            { "city": "Delhi", "response": delhi_feed() },
            { "city": "Mumbai", "response": { "status": "error", "data": "Unknown station" } }
        ]);
        let readings = adapter.normalize(raw).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].location, "Delhi");
    }
}
