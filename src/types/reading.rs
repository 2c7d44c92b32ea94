//! Reading types: MetalReading, MetalStatus, WaterQualityReading, WaterParameters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::index::{self, MetalLimits};

/// Canonical concentration unit for every metal value inside the core.
pub const CANONICAL_UNIT: &str = "μg/L";

// ============================================================================
// Metal readings
// ============================================================================

/// Per-metal compliance status against its regulatory limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetalStatus {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl std::fmt::Display for MetalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetalStatus::Normal => write!(f, "normal"),
            MetalStatus::Warning => write!(f, "warning"),
            MetalStatus::Critical => write!(f, "critical"),
        }
    }
}

/// One metal concentration inside a reading.
///
/// `value` is always expressed in [`CANONICAL_UNIT`]; conversion happens in
/// the adapters before a `MetalReading` is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetalReading {
    pub metal: String,
    pub value: f64,
    pub unit: String,
    pub status: MetalStatus,
}

impl MetalReading {
    /// Build a reading and derive its status from the limit table.
    pub fn new(metal: &str, value: f64, limits: &MetalLimits) -> Self {
        Self {
            metal: metal.to_string(),
            value,
            unit: CANONICAL_UNIT.to_string(),
            status: index::classify_metal(metal, value, limits),
        }
    }
}

// ============================================================================
// Water quality readings
// ============================================================================

/// Environmental parameters reported alongside metal concentrations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turbidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dissolved_oxygen: Option<f64>,
}

/// One normalized observation for a location at a point in time.
///
/// Produced only by source adapters (or the fallback generator) and never
/// mutated afterwards; the store appends new readings instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterQualityReading {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub hmpi: f64,
    pub metals: Vec<MetalReading>,
    #[serde(default)]
    pub parameters: WaterParameters,
    /// Human-readable provenance label of the adapter that produced it.
    #[serde(default)]
    pub source: String,
    /// True when the reading came from the fallback generator.
    #[serde(default)]
    pub synthetic: bool,
}

impl WaterQualityReading {
    /// Metals whose status is critical.
    pub fn critical_metals(&self) -> impl Iterator<Item = &MetalReading> {
        self.metals
            .iter()
            .filter(|m| m.status == MetalStatus::Critical)
    }

    /// Metals whose status is warning.
    pub fn warning_metals(&self) -> impl Iterator<Item = &MetalReading> {
        self.metals
            .iter()
            .filter(|m| m.status == MetalStatus::Warning)
    }

    /// Look up a metal by name (case-insensitive).
    pub fn metal(&self, name: &str) -> Option<&MetalReading> {
        self.metals
            .iter()
            .find(|m| m.metal.eq_ignore_ascii_case(name))
    }

    /// HMPI band of this reading.
    pub fn band(&self) -> index::HmpiBand {
        index::classify_hmpi(self.hmpi)
    }
}

/// A `{timestamp, value}` point, the input shape of every analyzer function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl TimePoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// One metal value from the history buffer, tagged with where and when it was seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetalSample {
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub reading: MetalReading,
    pub synthetic: bool,
}
