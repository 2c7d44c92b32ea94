//! Z-score anomaly detection against the full-series mean and σ.

use super::stats::{mean, population_std_dev, values};
use crate::types::{AnomalyPoint, AnomalySeverity, TimePoint};

/// Points whose |z| exceeds `threshold`, sorted by descending |z|.
///
/// Empty for constant or empty series.
pub fn detect_anomalies(series: &[TimePoint], threshold: f64) -> Vec<AnomalyPoint> {
    let vals = values(series);
    let (Some(mu), Some(sigma)) = (mean(&vals), population_std_dev(&vals)) else {
        return Vec::new();
    };
    if sigma <= 0.0 {
        return Vec::new();
    }

    let mut anomalies: Vec<AnomalyPoint> = series
        .iter()
        .enumerate()
        .filter_map(|(index, p)| {
            let z = (p.value - mu) / sigma;
            (z.abs() > threshold).then(|| AnomalyPoint {
                index,
                timestamp: p.timestamp,
                value: p.value,
                expected: mu,
                z_score: z,
                severity: AnomalySeverity::from_z(z),
            })
        })
        .collect();

    anomalies.sort_by(|a, b| {
        b.z_score
            .abs()
            .partial_cmp(&a.z_score.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    anomalies
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series(vals: &[f64]) -> Vec<TimePoint> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        vals.iter()
            .enumerate()
            .map(|(i, v)| TimePoint::new(t0 + Duration::hours(i as i64), *v))
            .collect()
    }

    #[test]
    fn test_single_outlier_flagged_exactly() {
        let mut vals = vec![10.0; 20];
        vals.push(100.0);
        let anomalies = detect_anomalies(&series(&vals), 2.5);

        assert_eq!(anomalies.len(), 1);
        let a = &anomalies[0];
        assert_eq!(a.index, 20);
        assert_eq!(a.value, 100.0);

        let mu = 300.0 / 21.0;
        let sigma = (vals.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / 21.0).sqrt();
        assert!((a.z_score - (100.0 - mu) / sigma).abs() < 1e-9);
        assert_eq!(a.severity, AnomalySeverity::Critical);
    }

    #[test]
    fn test_sorted_by_magnitude() {
        let mut vals = vec![50.0; 40];
        vals[5] = 0.0;
        vals[30] = 130.0;
        let anomalies = detect_anomalies(&series(&vals), 2.5);
        assert_eq!(anomalies.len(), 2);
        assert_eq!(anomalies[0].index, 30);
        assert!(anomalies[0].z_score.abs() >= anomalies[1].z_score.abs());
        assert!(anomalies[1].z_score < 0.0);
    }

    #[test]
    fn test_constant_and_empty_series() {
        assert!(detect_anomalies(&series(&[7.0; 12]), 2.5).is_empty());
        assert!(detect_anomalies(&[], 2.5).is_empty());
    }
}
