//! Analyzer output types: forecasts, ensemble, anomalies, trend deltas

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TrendDirection;

/// Which projector preset produced a forecast.
///
/// These are deterministic trend + seasonal-table + noise formulas, not
/// trained models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectorKind {
    ShortTerm,
    Seasonal,
    Blended,
}

impl std::fmt::Display for ProjectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectorKind::ShortTerm => write!(f, "short-term projector"),
            ProjectorKind::Seasonal => write!(f, "seasonal projector"),
            ProjectorKind::Blended => write!(f, "blended projector"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Nominal error metrics. Static per preset, not measured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub mae: f64,
    pub rmse: f64,
    pub mape: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub projector: ProjectorKind,
    pub points: Vec<ForecastPoint>,
    pub metrics: ModelMetrics,
    /// Least-squares slope (HMPI per day) used for the trend term.
    pub slope: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleForecast {
    pub points: Vec<ForecastPoint>,
    /// (projector, normalized weight)
    pub weights: Vec<(ProjectorKind, f64)>,
    pub metrics: ModelMetrics,
}

// ============================================================================
// Anomalies
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AnomalySeverity {
    /// Banding by |z|: >4 critical, >3 high, >2.5 medium, else low.
    pub fn from_z(z: f64) -> Self {
        let z = z.abs();
        if z > 4.0 {
            AnomalySeverity::Critical
        } else if z > 3.0 {
            AnomalySeverity::High
        } else if z > 2.5 {
            AnomalySeverity::Medium
        } else {
            AnomalySeverity::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyPoint {
    /// Position in the analysed series.
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub expected: f64,
    pub z_score: f64,
    pub severity: AnomalySeverity,
}

// ============================================================================
// Trend delta
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendDelta {
    pub recent_mean: f64,
    pub previous_mean: f64,
    /// Percentage change of the recent window against the previous one.
    pub trend_change: f64,
    pub window: usize,
    pub direction: TrendDirection,
}
