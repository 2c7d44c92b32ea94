//! Templated insight text and fixed recommendation lists
//!
//! Every insight title/description is produced here so the rule code in the
//! synthesizer only deals with numbers. Descriptions include the actual
//! statistic values (e.g. "Average HMPI moved from 53.3 to 91.7 (+71.9%)").

use crate::analysis::{MetalCorrelation, WeeklyProfile, WEEKDAY_NAMES};
use crate::types::{AnomalyPoint, MetalReading, TrendDelta, TrendDirection};

pub const DETERIORATING_TREND_ACTIONS: &[&str] = &[
    "Increase sampling frequency at the most affected sites",
    "Identify upstream industrial discharge points",
    "Notify the regional pollution control board",
];

pub const VOLATILITY_ACTIONS: &[&str] = &[
    "Verify sensor calibration at high-variance sites",
    "Check for intermittent discharge events",
];

pub const CORRELATION_ACTIONS: &[&str] = &[
    "Investigate a shared discharge source for the correlated metals",
    "Sample both metals together at affected sites",
];

pub const CRITICAL_METAL_ACTIONS: &[&str] = &[
    "Issue a water-use advisory for the affected area",
    "Collect confirmation samples within 24 hours",
    "Inspect nearby effluent outlets",
];

pub const RISK_ACTIONS: &[&str] = &[
    "Restrict drinking and irrigation use until levels fall",
    "Deploy emergency treatment or alternate supply",
];

pub const FORECAST_ACTIONS: &[&str] = &[
    "Schedule preventive inspections before the projected breach",
    "Pre-position treatment capacity",
];

pub const SIMULATED_DATA_ACTIONS: &[&str] = &["Check upstream API connectivity and credentials"];

pub const EMERGENCY_ACTIONS: &[&str] = &[
    "Activate the emergency response protocol",
    "Coordinate with health and municipal authorities",
    "Publish a public advisory for affected areas",
];

pub const HEALTH_ACTIONS: &[&str] = &[
    "Advise residents to use treated or bottled water",
    "Alert local health centres to heavy-metal exposure symptoms",
];

pub const MONITORING_ACTIONS: &[&str] = &[
    "Increase monitoring frequency network-wide",
    "Add temporary sampling stations downstream of hotspots",
];

pub fn trend_title(direction: TrendDirection) -> String {
    match direction {
        TrendDirection::Deteriorating => "HMPI deteriorating across the network".to_string(),
        TrendDirection::Improving => "HMPI improving across the network".to_string(),
        TrendDirection::Stable => "HMPI stable across the network".to_string(),
    }
}

pub fn trend_description(t: &TrendDelta) -> String {
    format!(
        "Average HMPI moved from {:.1} to {:.1} ({:+.1}%) comparing the last {} readings with the {} before them.",
        t.previous_mean, t.recent_mean, t.trend_change, t.window, t.window
    )
}

pub fn volatility_description(sigma: f64, window: usize) -> String {
    format!(
        "HMPI standard deviation over the last {window} readings is {sigma:.1}, indicating unstable water quality."
    )
}

pub fn seasonality_description(profile: &WeeklyProfile) -> String {
    let peak = profile.means[profile.peak_day].unwrap_or_default();
    let low = profile.means[profile.low_day].unwrap_or_default();
    format!(
        "HMPI peaks on {} (mean {:.1}) and is lowest on {} (mean {:.1}), a weekly spread of {:.1}.",
        WEEKDAY_NAMES[profile.peak_day], peak, WEEKDAY_NAMES[profile.low_day], low, profile.spread
    )
}

pub fn correlation_title(c: &MetalCorrelation) -> String {
    if c.r_value >= 0.0 {
        format!("{} and {} levels rise together", c.metal_a, c.metal_b)
    } else {
        format!("{} and {} levels move in opposite directions", c.metal_a, c.metal_b)
    }
}

pub fn correlation_description(c: &MetalCorrelation) -> String {
    format!(
        "Pearson r = {:.2} (p = {:.3}) over {} readings.",
        c.r_value, c.p_value, c.sample_count
    )
}

pub fn anomaly_description(a: &AnomalyPoint) -> String {
    format!(
        "Network HMPI of {:.1} at {} deviates from the mean {:.1} (z = {:+.2}).",
        a.value,
        a.timestamp.format("%Y-%m-%d %H:%M UTC"),
        a.expected,
        a.z_score
    )
}

pub fn critical_metals_description<'a>(
    metals: impl IntoIterator<Item = &'a MetalReading>,
) -> String {
    let listed: Vec<String> = metals
        .into_iter()
        .map(|m| format!("{} {:.2} {}", m.metal, m.value, m.unit))
        .collect();
    format!("Critical concentrations detected: {}.", listed.join(", "))
}

pub fn risk_description(location: &str, hmpi: f64, band_description: &str) -> String {
    format!("{location} reports HMPI {hmpi:.1}. {band_description}")
}

pub fn forecast_description(last: f64, projected: f64, horizon_days: u32) -> String {
    format!(
        "At the current slope, network HMPI is projected to rise from {last:.1} to {projected:.1} within {horizon_days} days, entering the critical band."
    )
}
