//! Metal Correlation Engine
//!
//! Pearson correlation between metal concentration series, with a two-tailed
//! p-value from Student's t-distribution (statrs). Series are aligned by
//! reading: only readings that report both metals contribute a pair.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::config::defaults::MIN_POINTS_FOR_CORRELATION;
use crate::types::WaterQualityReading;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetalCorrelation {
    pub metal_a: String,
    pub metal_b: String,
    pub r_value: f64,
    pub r_squared: f64,
    pub p_value: f64,
    pub sample_count: usize,
}

pub struct CorrelationEngine;

impl CorrelationEngine {
    /// Pearson correlation coefficient.
    ///
    /// r = Σ[(xi - x̄)(yi - ȳ)] / sqrt(Σ(xi - x̄)² × Σ(yi - ȳ)²)
    ///
    /// Zero when the lengths differ, either series is empty, or either series
    /// has zero variance.
    pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
        if x.is_empty() || x.len() != y.len() || is_constant(x) || is_constant(y) {
            return 0.0;
        }
        let n = x.len() as f64;
        let x_mean = x.iter().sum::<f64>() / n;
        let y_mean = y.iter().sum::<f64>() / n;

        let (sxy, sxx, syy) = x.iter().zip(y).fold((0.0, 0.0, 0.0), |(sxy, sxx, syy), (a, b)| {
            let dx = a - x_mean;
            let dy = b - y_mean;
            (sxy + dx * dy, sxx + dx * dx, syy + dy * dy)
        });

        let denominator = (sxx * syy).sqrt();
        if denominator == 0.0 || !denominator.is_finite() {
            0.0
        } else {
            (sxy / denominator).clamp(-1.0, 1.0)
        }
    }

    /// Two-tailed p-value for `r` over `n` samples.
    ///
    /// t = r × sqrt(n-2) / sqrt(1-r²), df = n-2
    pub fn p_value_for_r(r: f64, n: usize) -> f64 {
        if n < 3 {
            return 1.0;
        }
        if r.abs() >= 0.9999 {
            return 0.0;
        }

        let df = (n - 2) as f64;
        let t_stat = r * df.sqrt() / (1.0 - r * r).sqrt();

        match StudentsT::new(0.0, 1.0, df) {
            Ok(t_dist) => 2.0 * (1.0 - t_dist.cdf(t_stat.abs())),
            Err(_) => 1.0,
        }
    }

    /// Correlation of two named series, `None` below the minimum sample count.
    pub fn calculate(x: &[f64], y: &[f64], x_name: &str, y_name: &str) -> Option<MetalCorrelation> {
        let n = x.len();
        if n < MIN_POINTS_FOR_CORRELATION || n != y.len() {
            return None;
        }
        let r = Self::pearson(x, y);
        Some(MetalCorrelation {
            metal_a: x_name.to_string(),
            metal_b: y_name.to_string(),
            r_value: r,
            r_squared: r * r,
            p_value: Self::p_value_for_r(r, n),
            sample_count: n,
        })
    }

    /// All metal pairs whose |r| exceeds `threshold`, strongest first.
    pub fn analyze_metal_correlations(
        readings: &[WaterQualityReading],
        threshold: f64,
    ) -> Vec<MetalCorrelation> {
        let mut metals: Vec<String> = Vec::new();
        for r in readings {
            for m in &r.metals {
                if !metals.iter().any(|known| known.eq_ignore_ascii_case(&m.metal)) {
                    metals.push(m.metal.clone());
                }
            }
        }

        let mut correlations = Vec::new();
        for (i, a) in metals.iter().enumerate() {
            for b in &metals[i + 1..] {
                let (x, y): (Vec<f64>, Vec<f64>) = readings
                    .iter()
                    .filter_map(|r| Some((r.metal(a)?.value, r.metal(b)?.value)))
                    .unzip();
                if let Some(c) = Self::calculate(&x, &y, a, b) {
                    if c.r_value.abs() > threshold {
                        correlations.push(c);
                    }
                }
            }
        }

        correlations.sort_by(|a, b| {
            b.r_value
                .abs()
                .partial_cmp(&a.r_value.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        correlations
    }
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MetalLimits;
    use crate::types::MetalReading;
    use chrono::Utc;

    fn reading(metals: &[(&str, f64)]) -> WaterQualityReading {
        let limits = MetalLimits::default();
        WaterQualityReading {
            location: "Site".to_string(),
            latitude: None,
            longitude: None,
            timestamp: Utc::now(),
            hmpi: 0.0,
            metals: metals
                .iter()
                .map(|(m, v)| MetalReading::new(m, *v, &limits))
                .collect(),
            parameters: Default::default(),
            source: "test".to_string(),
            synthetic: false,
        }
    }

    #[test]
    fn test_self_correlation_is_one() {
        let x = [3.1, 4.7, 1.2, 9.9, 5.5, 0.3];
        assert!((CorrelationEngine::pearson(&x, &x) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_negation_is_minus_one() {
        let x = [3.1, 4.7, 1.2, 9.9, 5.5, 0.3];
        let neg: Vec<f64> = x.iter().map(|v| -v).collect();
        assert!((CorrelationEngine::pearson(&x, &neg) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_series_is_zero_not_nan() {
        let c = [0.1; 10];
        let r = CorrelationEngine::pearson(&c, &c);
        assert_eq!(r, 0.0);
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(CorrelationEngine::pearson(&x, &c), 0.0);
    }

    #[test]
    fn test_mismatched_or_empty() {
        assert_eq!(CorrelationEngine::pearson(&[], &[]), 0.0);
        assert_eq!(CorrelationEngine::pearson(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_p_value_calculation_accuracy() {
        // r=0.5, n=30 → p ≈ 0.005
        let p = CorrelationEngine::p_value_for_r(0.5, 30);
        assert!(p < 0.01 && p > 0.001, "got {p}");
        // r=0.2, n=30 → p ≈ 0.29
        assert!(CorrelationEngine::p_value_for_r(0.2, 30) > 0.2);
        assert_eq!(CorrelationEngine::p_value_for_r(0.9, 2), 1.0);
    }

    #[test]
    fn test_metal_pairs_aligned_by_reading() {
        let readings: Vec<_> = (1..=10)
            .map(|i| {
                let v = i as f64;
                // Zinc only appears in some readings and is constant
                if i % 3 == 0 {
                    reading(&[
                        ("Lead", v),
                        ("Cadmium", 2.0 * v + 1.0),
                        ("Mercury", 11.0 - v),
                        ("Zinc", 1.0),
                    ])
                } else {
                    reading(&[("Lead", v), ("Cadmium", 2.0 * v + 1.0), ("Mercury", 11.0 - v)])
                }
            })
            .collect();

        let found = CorrelationEngine::analyze_metal_correlations(&readings, 0.7);
        assert_eq!(found.len(), 3, "{found:?}");
        assert!(found.iter().all(|c| c.r_value.abs() > 0.99));
        assert!(found.iter().all(|c| c.sample_count == 10));
        let lead_mercury = found
            .iter()
            .find(|c| c.metal_a == "Lead" && c.metal_b == "Mercury")
            .unwrap();
        assert!(lead_mercury.r_value < 0.0);
    }

    #[test]
    fn test_too_few_aligned_values() {
        let readings = vec![
            reading(&[("Lead", 1.0), ("Cadmium", 2.0)]),
            reading(&[("Lead", 2.0), ("Cadmium", 4.0)]),
        ];
        assert!(CorrelationEngine::analyze_metal_correlations(&readings, 0.7).is_empty());
    }
}
