//! Monitor Configuration - polling, sources, store and analysis settings
//!
//! Every struct implements `Default` with the values in `defaults.rs`, so an
//! empty or missing file yields a working configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;
use crate::index::MetalLimits;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one monitor deployment.
///
/// Load with `MonitorConfig::load()` which searches:
/// 1. `$HMPI_CONFIG` env var
/// 2. `./hmpi_monitor.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Metal name → limit in μg/L, applied on top of the built-in table.
    #[serde(default)]
    pub limits: BTreeMap<String, f64>,
}

impl MonitorConfig {
    /// Load using the standard search order, then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_file_or_default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    fn load_file_or_default() -> Self {
        if let Ok(path) = std::env::var("HMPI_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded monitor config from HMPI_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(
                            path = %p.display(),
                            error = %e,
                            "Failed to load config from HMPI_CONFIG, falling back"
                        );
                    }
                }
            } else {
                warn!(path = %path, "HMPI_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("hmpi_monitor.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded monitor config from ./hmpi_monitor.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./hmpi_monitor.toml, using defaults");
                }
            }
        }

        info!("No hmpi_monitor.toml found, using built-in defaults");
        Self::default()
    }

    /// Load and validate a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        for w in super::validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("HMPI_SERVER_ADDR") {
            self.server.addr = addr;
        }
        if let Some(raw) = lookup("HMPI_REFRESH_INTERVAL_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.polling.refresh_interval_ms = ms,
                Err(_) => warn!(value = %raw, "Ignoring invalid HMPI_REFRESH_INTERVAL_MS"),
            }
        }
        if let Some(raw) = lookup("HMPI_ENABLE_FALLBACK") {
            match parse_flag(&raw) {
                Some(enabled) => self.polling.enable_fallback = enabled,
                None => warn!(value = %raw, "Ignoring invalid HMPI_ENABLE_FALLBACK"),
            }
        }
        if let Some(key) = lookup("WAQI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.sources.waqi_api_key = Some(key);
        }
        if let Some(url) = lookup("HMPI_BACKUP_API_URL").filter(|u| !u.trim().is_empty()) {
            self.sources.backup_api_url = Some(url);
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Limit table with `[limits]` overrides applied.
    pub fn metal_limits(&self) -> MetalLimits {
        MetalLimits::with_overrides(&self.limits)
    }

    /// Validate all values. Every violation is collected, not just the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.server.addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!("server.addr '{}' is not a socket address", self.server.addr));
        }

        let p = &self.polling;
        if p.refresh_interval_ms == 0 {
            errors.push("polling.refresh_interval_ms must be > 0".to_string());
        }
        if p.request_timeout_secs == 0 {
            errors.push("polling.request_timeout_secs must be > 0".to_string());
        }

        let s = &self.sources;
        if s.cities.is_empty() {
            errors.push("sources.cities must name at least one city".to_string());
        }
        if s.openaq_limit == 0 {
            errors.push("sources.openaq_limit must be > 0".to_string());
        }
        for (name, url) in [
            ("sources.waqi_base_url", &s.waqi_base_url),
            ("sources.safar_base_url", &s.safar_base_url),
            ("sources.openaq_base_url", &s.openaq_base_url),
        ] {
            check_url(name, url, &mut errors);
        }
        if let Some(url) = &s.backup_api_url {
            check_url("sources.backup_api_url", url, &mut errors);
        }

        let st = &self.store;
        if st.max_readings == 0 {
            errors.push("store.max_readings must be > 0".to_string());
        }
        if st.max_alerts == 0 {
            errors.push("store.max_alerts must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&st.warning_alert_probability) {
            errors.push(format!(
                "store.warning_alert_probability ({}) must be within [0, 1]",
                st.warning_alert_probability
            ));
        }

        let a = &self.analysis;
        for (name, value) in [
            ("analysis.anomaly_threshold", a.anomaly_threshold),
            ("analysis.trend_materiality_percent", a.trend_materiality_percent),
            ("analysis.volatility_threshold", a.volatility_threshold),
            ("analysis.correlation_threshold", a.correlation_threshold),
        ] {
            if !value.is_finite() {
                errors.push(format!("{name} must be finite (got {value})"));
            }
        }
        if a.anomaly_threshold.is_finite() && a.anomaly_threshold <= 0.0 {
            errors.push("analysis.anomaly_threshold must be > 0".to_string());
        }
        if a.correlation_threshold.is_finite()
            && !(a.correlation_threshold > 0.0 && a.correlation_threshold <= 1.0)
        {
            errors.push(format!(
                "analysis.correlation_threshold ({}) must be within (0, 1]",
                a.correlation_threshold
            ));
        }
        if a.trend_window < 1 {
            errors.push("analysis.trend_window must be >= 1".to_string());
        }
        if a.forecast_horizon_days == 0 {
            errors.push("analysis.forecast_horizon_days must be > 0".to_string());
        }

        for (metal, limit) in &self.limits {
            if !limit.is_finite() || *limit <= 0.0 {
                errors.push(format!("limits.{metal} must be a positive number (got {limit})"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

fn check_url(name: &str, url: &str, errors: &mut Vec<String>) {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(format!("{name} '{url}' must start with http:// or https://"));
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address. Overridden by `HMPI_SERVER_ADDR` or `--addr`.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Polling
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// When false, total adapter exhaustion reports a failure instead of
    /// synthesizing readings.
    #[serde(default = "default_enable_fallback")]
    pub enable_fallback: bool,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_refresh_interval_ms() -> u64 { defaults::REFRESH_INTERVAL_MS }
fn default_enable_fallback() -> bool { true }
fn default_request_timeout_secs() -> u64 { defaults::REQUEST_TIMEOUT_SECS }

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            enable_fallback: default_enable_fallback(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl PollingConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============================================================================
// Sources
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// WAQI token. The WAQI adapter fails without it; others are unaffected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waqi_api_key: Option<String>,

    #[serde(default = "default_waqi_base_url")]
    pub waqi_base_url: String,

    #[serde(default = "default_safar_base_url")]
    pub safar_base_url: String,

    #[serde(default = "default_openaq_base_url")]
    pub openaq_base_url: String,

    /// Optional backup API serving readings in canonical shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_api_url: Option<String>,

    #[serde(default = "default_cities")]
    pub cities: Vec<String>,

    #[serde(default = "default_openaq_country")]
    pub openaq_country: String,

    #[serde(default = "default_openaq_limit")]
    pub openaq_limit: u32,
}

fn default_waqi_base_url() -> String { defaults::WAQI_BASE_URL.to_string() }
fn default_safar_base_url() -> String { defaults::SAFAR_BASE_URL.to_string() }
fn default_openaq_base_url() -> String { defaults::OPENAQ_BASE_URL.to_string() }
fn default_cities() -> Vec<String> { defaults::CITIES.iter().map(|c| c.to_string()).collect() }
fn default_openaq_country() -> String { defaults::OPENAQ_COUNTRY.to_string() }
fn default_openaq_limit() -> u32 { defaults::OPENAQ_LIMIT }

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            waqi_api_key: None,
            waqi_base_url: default_waqi_base_url(),
            safar_base_url: default_safar_base_url(),
            openaq_base_url: default_openaq_base_url(),
            backup_api_url: None,
            cities: default_cities(),
            openaq_country: default_openaq_country(),
            openaq_limit: default_openaq_limit(),
        }
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_max_readings")]
    pub max_readings: usize,

    #[serde(default = "default_max_alerts")]
    pub max_alerts: usize,

    #[serde(default = "default_warning_alert_probability")]
    pub warning_alert_probability: f64,
}

fn default_max_readings() -> usize { defaults::MAX_READINGS }
fn default_max_alerts() -> usize { defaults::MAX_ALERTS }
fn default_warning_alert_probability() -> f64 { defaults::WARNING_ALERT_PROBABILITY }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_readings: default_max_readings(),
            max_alerts: default_max_alerts(),
            warning_alert_probability: default_warning_alert_probability(),
        }
    }
}

// ============================================================================
// Analysis
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_anomaly_threshold")]
    pub anomaly_threshold: f64,

    #[serde(default = "default_trend_window")]
    pub trend_window: usize,

    #[serde(default = "default_trend_materiality")]
    pub trend_materiality_percent: f64,

    #[serde(default = "default_volatility_threshold")]
    pub volatility_threshold: f64,

    #[serde(default = "default_correlation_threshold")]
    pub correlation_threshold: f64,

    #[serde(default = "default_forecast_horizon_days")]
    pub forecast_horizon_days: u32,
}

fn default_anomaly_threshold() -> f64 { defaults::ANOMALY_THRESHOLD }
fn default_trend_window() -> usize { defaults::TREND_WINDOW }
fn default_trend_materiality() -> f64 { defaults::TREND_MATERIALITY_PERCENT }
fn default_volatility_threshold() -> f64 { defaults::VOLATILITY_THRESHOLD }
fn default_correlation_threshold() -> f64 { defaults::CORRELATION_THRESHOLD }
fn default_forecast_horizon_days() -> u32 { defaults::FORECAST_HORIZON_DAYS }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: default_anomaly_threshold(),
            trend_window: default_trend_window(),
            trend_materiality_percent: default_trend_materiality(),
            volatility_threshold: default_volatility_threshold(),
            correlation_threshold: default_correlation_threshold(),
            forecast_horizon_days: default_forecast_horizon_days(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
