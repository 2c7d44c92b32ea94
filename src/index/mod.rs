//! Heavy Metal Pollution Index
//!
//! Pure functions, no I/O:
//! - `compute_hmpi`: mean over metals of `Ci / Si × 100`
//! - `classify_metal`: per-metal status from the limit ratio
//! - `classify_hmpi`: one canonical HMPI banding used everywhere
//! - `apportion_metals`: provider index → metal breakdown
//! - `to_micrograms_per_litre`: unit normalization

mod limits;

pub use limits::{MetalLimits, METAL_LIMITS, MONITORED_METALS};

use serde::{Deserialize, Serialize};

use crate::types::{MetalReading, MetalStatus};

/// Ratio above which a metal is in warning.
pub const WARNING_RATIO: f64 = 1.0;

/// Ratio above which a metal is critical.
pub const CRITICAL_RATIO: f64 = 1.5;

/// HMPI band lower bounds.
pub const MODERATE_HMPI: f64 = 30.0;
pub const HIGH_HMPI: f64 = 50.0;
pub const CRITICAL_HMPI: f64 = 75.0;

/// HMPI returned when no metal contributes (empty list or no known limits).
pub const EMPTY_HMPI: f64 = 0.0;

// ============================================================================
// HMPI
// ============================================================================

/// Compute HMPI from metal concentrations.
///
/// Metals missing from `limits` (or with a non-finite value) are excluded
/// from the average rather than counted as zero. Returns [`EMPTY_HMPI`] when
/// nothing contributes.
pub fn compute_hmpi(metals: &[MetalReading], limits: &MetalLimits) -> f64 {
    let (sum, count) = metals
        .iter()
        .filter(|m| m.value.is_finite())
        .filter_map(|m| limits.get(&m.metal).map(|limit| m.value / limit * 100.0))
        .fold((0.0, 0usize), |(sum, count), sub| (sum + sub, count + 1));

    if count == 0 {
        EMPTY_HMPI
    } else {
        sum / count as f64
    }
}

/// Limit ratio for one metal, `None` when the metal has no limit.
pub fn metal_ratio(metal: &str, value: f64, limits: &MetalLimits) -> Option<f64> {
    limits.get(metal).map(|limit| value / limit)
}

/// Status of one metal concentration.
///
/// `value == limit` is still normal; anything above the limit is a warning
/// and above 1.5× the limit critical. Unknown metals are normal.
pub fn classify_metal(metal: &str, value: f64, limits: &MetalLimits) -> MetalStatus {
    match metal_ratio(metal, value, limits) {
        Some(r) if r > CRITICAL_RATIO => MetalStatus::Critical,
        Some(r) if r > WARNING_RATIO => MetalStatus::Warning,
        _ => MetalStatus::Normal,
    }
}

// ============================================================================
// Banding
// ============================================================================

/// Canonical HMPI band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HmpiBand {
    Safe,
    Moderate,
    High,
    Critical,
}

impl HmpiBand {
    pub fn label(self) -> &'static str {
        match self {
            HmpiBand::Safe => "Safe",
            HmpiBand::Moderate => "Moderate",
            HmpiBand::High => "High",
            HmpiBand::Critical => "Critical",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            HmpiBand::Safe => "Metal concentrations well within regulatory limits",
            HmpiBand::Moderate => "Elevated concentrations, continue routine monitoring",
            HmpiBand::High => "High contamination, treatment required before use",
            HmpiBand::Critical => "Critical contamination, unsafe for consumption",
        }
    }

    pub fn is_critical(self) -> bool {
        self == HmpiBand::Critical
    }
}

impl std::fmt::Display for HmpiBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Classify an HMPI value: `<30` safe, `<50` moderate, `<75` high, else critical.
pub fn classify_hmpi(hmpi: f64) -> HmpiBand {
    if hmpi >= CRITICAL_HMPI {
        HmpiBand::Critical
    } else if hmpi >= HIGH_HMPI {
        HmpiBand::High
    } else if hmpi >= MODERATE_HMPI {
        HmpiBand::Moderate
    } else {
        HmpiBand::Safe
    }
}

// ============================================================================
// Apportioning
// ============================================================================

/// Split a provider-level HMPI into per-metal concentrations.
///
/// Each `(metal, driver)` pair names a metal and the provider sub-index that
/// drives it. Drivers are normalized by their mean so the metals keep the
/// provider's relative proportions while `compute_hmpi` of the result equals
/// `hmpi`. Missing drivers take the mean of the present ones; with no usable
/// driver every metal sits at the same ratio. Metals without a limit are
/// skipped.
pub fn apportion_metals(
    hmpi: f64,
    drivers: &[(&str, Option<f64>)],
    limits: &MetalLimits,
) -> Vec<MetalReading> {
    let known: Vec<(&str, Option<f64>)> = drivers
        .iter()
        .copied()
        .filter(|(metal, _)| limits.contains(metal))
        .collect();

    let present: Vec<f64> = known
        .iter()
        .filter_map(|(_, d)| *d)
        .filter(|d| d.is_finite() && *d > 0.0)
        .collect();
    let present_mean = if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    };

    let raw: Vec<f64> = known
        .iter()
        .map(|(_, d)| match (d, present_mean) {
            (Some(v), Some(_)) if v.is_finite() && *v > 0.0 => *v,
            (_, Some(mean)) => mean,
            (_, None) => 1.0,
        })
        .collect();
    let raw_mean = if raw.is_empty() {
        1.0
    } else {
        raw.iter().sum::<f64>() / raw.len() as f64
    };

    let hmpi = hmpi.max(0.0);
    known
        .iter()
        .zip(raw)
        .filter_map(|((metal, _), r)| {
            let limit = limits.get(metal)?;
            let value = limit * hmpi / 100.0 * (r / raw_mean);
            Some(MetalReading::new(metal, value, limits))
        })
        .collect()
}

/// Apportion with no driver information: every monitored metal at the same ratio.
pub fn uniform_metals(hmpi: f64, limits: &MetalLimits) -> Vec<MetalReading> {
    let drivers: Vec<(&str, Option<f64>)> = MONITORED_METALS.iter().map(|m| (*m, None)).collect();
    apportion_metals(hmpi, &drivers, limits)
}

// ============================================================================
// Units
// ============================================================================

/// Convert a concentration to μg/L. Returns `None` for unknown units.
pub fn to_micrograms_per_litre(value: f64, unit: &str) -> Option<f64> {
    let normalized = unit.trim().to_ascii_lowercase().replace('µ', "μ");
    match normalized.as_str() {
        "μg/l" | "ug/l" | "ppb" | "mcg/l" => Some(value),
        "mg/l" | "ppm" => Some(value * 1000.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metal(name: &str, value: f64) -> MetalReading {
        MetalReading::new(name, value, &MetalLimits::default())
    }

    #[test]
    fn test_value_at_limit_is_boundary_normal() {
        let limits = MetalLimits::default();
        let ratio = metal_ratio("Lead", 10.0, &limits).unwrap();
        assert!((ratio - 1.0).abs() < f64::EPSILON);
        assert_eq!(classify_metal("Lead", 10.0, &limits), MetalStatus::Normal);
        assert_eq!(classify_metal("Lead", 10.01, &limits), MetalStatus::Warning);
    }

    #[test]
    fn test_critical_above_one_and_a_half_limit() {
        let limits = MetalLimits::default();
        assert_eq!(classify_metal("Cadmium", 4.5, &limits), MetalStatus::Warning);
        assert_eq!(classify_metal("Cadmium", 4.6, &limits), MetalStatus::Critical);
    }

    #[test]
    fn test_unknown_metal_is_normal() {
        let limits = MetalLimits::default();
        assert_eq!(classify_metal("Unobtainium", 1e9, &limits), MetalStatus::Normal);
    }

    #[test]
    fn test_empty_metals_hmpi_is_zero() {
        let hmpi = compute_hmpi(&[], &MetalLimits::default());
        assert_eq!(hmpi, EMPTY_HMPI);
        assert!(!hmpi.is_nan());
    }

    #[test]
    fn test_hmpi_mean_of_ratios() {
        // Lead at limit (100), Cadmium at half (50) => 75
        let metals = vec![metal("Lead", 10.0), metal("Cadmium", 1.5)];
        let hmpi = compute_hmpi(&metals, &MetalLimits::default());
        assert!((hmpi - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_metal_without_limit_excluded_not_zero_filled() {
        let metals = vec![metal("Lead", 10.0), metal("Unobtainium", 0.0)];
        let hmpi = compute_hmpi(&metals, &MetalLimits::default());
        assert!((hmpi - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_known_limits_returns_empty_value() {
        let metals = vec![metal("Lead", 10.0)];
        assert_eq!(compute_hmpi(&metals, &MetalLimits::empty()), EMPTY_HMPI);
    }

    #[test]
    fn test_hmpi_bands() {
        assert_eq!(classify_hmpi(0.0), HmpiBand::Safe);
        assert_eq!(classify_hmpi(29.9), HmpiBand::Safe);
        assert_eq!(classify_hmpi(30.0), HmpiBand::Moderate);
        assert_eq!(classify_hmpi(49.9), HmpiBand::Moderate);
        assert_eq!(classify_hmpi(50.0), HmpiBand::High);
        assert_eq!(classify_hmpi(74.9), HmpiBand::High);
        assert_eq!(classify_hmpi(75.0), HmpiBand::Critical);
        assert!(classify_hmpi(140.0).is_critical());
    }

    #[test]
    fn test_apportioned_metals_reproduce_hmpi() {
        let limits = MetalLimits::default();
        let drivers = [
            ("Lead", Some(120.0)),
            ("Cadmium", Some(80.0)),
            ("Arsenic", None),
            ("Chromium", Some(40.0)),
            ("Mercury", Some(10.0)),
        ];
        let metals = apportion_metals(62.0, &drivers, &limits);
        assert_eq!(metals.len(), 5);
        assert!((compute_hmpi(&metals, &limits) - 62.0).abs() < 1e-9);

        // Lead is driven harder than Mercury
        let lead = metals.iter().find(|m| m.metal == "Lead").unwrap();
        let mercury = metals.iter().find(|m| m.metal == "Mercury").unwrap();
        assert!(lead.value / 10.0 > mercury.value / 1.0);
    }

    #[test]
    fn test_uniform_metals_share_one_ratio() {
        let limits = MetalLimits::default();
        let metals = uniform_metals(160.0, &limits);
        assert_eq!(metals.len(), MONITORED_METALS.len());
        for m in &metals {
            let ratio = metal_ratio(&m.metal, m.value, &limits).unwrap();
            assert!((ratio - 1.6).abs() < 1e-9);
            assert_eq!(m.status, MetalStatus::Critical);
        }
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(to_micrograms_per_litre(5.0, "μg/L"), Some(5.0));
        assert_eq!(to_micrograms_per_litre(5.0, "ug/l"), Some(5.0));
        assert_eq!(to_micrograms_per_litre(5.0, "µg/L"), Some(5.0));
        assert_eq!(to_micrograms_per_litre(0.005, "mg/L"), Some(5.0));
        assert_eq!(to_micrograms_per_litre(5.0, "furlongs"), None);
    }
}
