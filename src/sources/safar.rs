//! SAFAR (System of Air Quality and Weather Forecasting) bulletin adapter.
//!
//! `GET {base}/api/bulletin?city={city}` per configured city. A bulletin with
//! a station list yields one reading per station; otherwise one city-level
//! reading.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::http::{get_json, join_url};
use super::scale::{safar_aqi_to_hmpi, POLLUTANT_DRIVERS};
use super::{RawPayload, SourceAdapter, SourceError};
use crate::index::{apportion_metals, MetalLimits};
use crate::types::{WaterParameters, WaterQualityReading};

pub const LABEL: &str = "SAFAR";

#[derive(Debug, Deserialize)]
struct SafarBulletin {
    #[serde(default)]
    city: Option<String>,
    #[serde(default, alias = "AQI")]
    aqi: Option<f64>,
    #[serde(default, alias = "lat")]
    latitude: Option<f64>,
    #[serde(default, alias = "lon", alias = "lng")]
    longitude: Option<f64>,
    #[serde(default, alias = "date", alias = "updated")]
    timestamp: Option<String>,
    #[serde(default)]
    pollutants: HashMap<String, f64>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    stations: Vec<SafarStation>,
}

#[derive(Debug, Deserialize)]
struct SafarStation {
    name: String,
    #[serde(default, alias = "AQI")]
    aqi: Option<f64>,
    #[serde(default, alias = "lat")]
    latitude: Option<f64>,
    #[serde(default, alias = "lon", alias = "lng")]
    longitude: Option<f64>,
    #[serde(default)]
    pollutants: HashMap<String, f64>,
}

pub struct SafarAdapter {
    client: reqwest::Client,
    base_url: String,
    cities: Vec<String>,
    limits: MetalLimits,
}

impl SafarAdapter {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        cities: Vec<String>,
        limits: MetalLimits,
    ) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            cities,
            limits,
        }
    }

    /// Raw bulletin for one city, passed through unchanged.
    pub async fn fetch_city(&self, city: &str) -> Result<serde_json::Value, SourceError> {
        let url = join_url(&self.base_url, "api/bulletin");
        get_json(&self.client, &url, &[("city", city.trim())]).await
    }
}

#[async_trait]
impl SourceAdapter for SafarAdapter {
    fn label(&self) -> &str {
        LABEL
    }

    async fn fetch(&self) -> Result<RawPayload, SourceError> {
        let responses = join_all(self.cities.iter().map(|city| async move {
            (city.as_str(), self.fetch_city(city).await)
        }))
        .await;

        let mut last_error = None;
        let mut bulletins = Vec::new();
        for (city, result) in responses {
            match result {
                Ok(body) => bulletins.push(json!({ "city": city, "response": body })),
                Err(e) => {
                    warn!(source = LABEL, city, error = %e, "City request failed");
                    last_error = Some(e);
                }
            }
        }

        match (bulletins.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(serde_json::Value::Array(bulletins)),
        }
    }

    fn normalize(&self, raw: RawPayload) -> Result<Vec<WaterQualityReading>, SourceError> {
        let entries = raw
            .as_array()
            .ok_or_else(|| SourceError::Parse("expected an array of bulletins".to_string()))?;

        let mut readings = Vec::new();
        for entry in entries {
            let city = entry.get("city").and_then(|c| c.as_str()).unwrap_or("Unknown");
            let Some(response) = entry.get("response") else {
                continue;
            };
            match normalize_bulletin(city, response, &self.limits) {
                Ok(mut batch) => readings.append(&mut batch),
                Err(e) => warn!(source = LABEL, city, error = %e, "Skipping unusable bulletin"),
            }
        }
        Ok(readings)
    }
}

/// Convert one bulletin into readings (one per station, or one for the city).
pub fn normalize_bulletin(
    city: &str,
    response: &serde_json::Value,
    limits: &MetalLimits,
) -> Result<Vec<WaterQualityReading>, SourceError> {
    let bulletin: SafarBulletin = serde_json::from_value(response.clone())?;
    let city = bulletin.city.as_deref().unwrap_or(city);
    let timestamp = bulletin
        .timestamp
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(Utc::now);
    let parameters = WaterParameters {
        temperature: bulletin.temperature,
        ..WaterParameters::default()
    };

    let build = |location: String,
                 aqi: f64,
                 pollutants: &HashMap<String, f64>,
                 latitude: Option<f64>,
                 longitude: Option<f64>| {
        let hmpi = safar_aqi_to_hmpi(aqi);
        let drivers: Vec<(&str, Option<f64>)> = POLLUTANT_DRIVERS
            .iter()
            .map(|(pollutant, metal)| (*metal, lookup_pollutant(pollutants, pollutant)))
            .collect();
        WaterQualityReading {
            location,
            latitude,
            longitude,
            timestamp,
            hmpi,
            metals: apportion_metals(hmpi, &drivers, limits),
            parameters: parameters.clone(),
            source: LABEL.to_string(),
            synthetic: false,
        }
    };

    let stations: Vec<WaterQualityReading> = bulletin
        .stations
        .iter()
        .filter_map(|s| {
            let aqi = s.aqi?;
            Some(build(
                format!("{}, {}", s.name, city),
                aqi,
                &s.pollutants,
                s.latitude,
                s.longitude,
            ))
        })
        .collect();
    if !stations.is_empty() {
        return Ok(stations);
    }

    let aqi = bulletin
        .aqi
        .ok_or_else(|| SourceError::NoData(format!("{LABEL} {city}")))?;
    Ok(vec![build(
        city.to_string(),
        aqi,
        &bulletin.pollutants,
        bulletin.latitude,
        bulletin.longitude,
    )])
}

/// SAFAR keys pollutants as "pm2.5"/"PM25"/"pm25"; match loosely.
fn lookup_pollutant(pollutants: &HashMap<String, f64>, key: &str) -> Option<f64> {
    pollutants.iter().find_map(|(k, v)| {
        let normalized: String = k
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        (normalized == key).then_some(*v)
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|n| n.and_utc())
        })
}
