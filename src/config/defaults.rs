//! System-wide default constants.
//!
//! Grouped by subsystem. Tunable values live in `MonitorConfig`; these are
//! the built-in defaults it falls back to plus the fixed constants that are
//! not operator-tunable.

// ============================================================================
// Server
// ============================================================================

pub const SERVER_ADDR: &str = "0.0.0.0:8080";

// ============================================================================
// Polling
// ============================================================================

/// Interval between aggregation cycles (ms).
pub const REFRESH_INTERVAL_MS: u64 = 30_000;

/// Per-request timeout for upstream providers (seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 8;

/// Broadcast channel capacity for monitor events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// Sources
// ============================================================================

pub const WAQI_BASE_URL: &str = "https://api.waqi.info";
pub const SAFAR_BASE_URL: &str = "https://safar.tropmet.res.in";
pub const OPENAQ_BASE_URL: &str = "https://api.openaq.org";

pub const CITIES: [&str; 6] = ["Delhi", "Mumbai", "Kolkata", "Chennai", "Bangalore", "Hyderabad"];

pub const OPENAQ_COUNTRY: &str = "IN";
pub const OPENAQ_LIMIT: u32 = 100;

/// Provenance label of the synthetic generator. Consumers match on
/// "Simulated"/"Fallback" to detect synthetic batches.
pub const FALLBACK_SOURCE_LABEL: &str = "Simulated Data (Fallback)";

// ============================================================================
// Store
// ============================================================================

/// Rolling reading buffer capacity.
pub const MAX_READINGS: usize = 1_000;

/// Alert log capacity.
pub const MAX_ALERTS: usize = 50;

/// Chance that a warning-status metal raises a pollution-spike alert.
pub const WARNING_ALERT_PROBABILITY: f64 = 0.3;

// ============================================================================
// Analysis
// ============================================================================

pub const ANOMALY_THRESHOLD: f64 = 2.5;

/// Points per trend window (capped at half the series).
pub const TREND_WINDOW: usize = 14;

/// |Δ%| above which a trend is reported.
pub const TREND_MATERIALITY_PERCENT: f64 = 5.0;

/// Population σ above which the recent window is reported as volatile.
pub const VOLATILITY_THRESHOLD: f64 = 15.0;

/// |r| above which a metal pair is reported as correlated.
pub const CORRELATION_THRESHOLD: f64 = 0.7;

pub const FORECAST_HORIZON_DAYS: u32 = 7;

/// Minimum points before weekday seasonality is meaningful.
pub const MIN_POINTS_FOR_SEASONALITY: usize = 30;

/// Minimum aligned values before a correlation is reported.
pub const MIN_POINTS_FOR_CORRELATION: usize = 3;

/// Anomaly insights emitted per cycle.
pub const MAX_ANOMALY_INSIGHTS: usize = 3;
