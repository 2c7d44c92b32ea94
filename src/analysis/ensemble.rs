//! Accuracy-weighted ensemble over projector outputs.

use crate::types::{EnsembleForecast, ForecastPoint, ForecastResult, ModelMetrics};

/// Merge forecasts point-by-point with weights proportional to nominal
/// accuracy. Points are aligned by index up to the shortest input.
///
/// Reported error metrics are the best input's × 0.9 and the accuracy is the
/// best input's. `None` for no inputs or an all-zero accuracy sum.
pub fn create_ensemble_forecast(results: &[ForecastResult]) -> Option<EnsembleForecast> {
    let total: f64 = results.iter().map(|r| r.metrics.accuracy).sum();
    if results.is_empty() || total <= 0.0 {
        return None;
    }

    let weights: Vec<_> = results
        .iter()
        .map(|r| (r.projector, r.metrics.accuracy / total))
        .collect();

    let len = results.iter().map(|r| r.points.len()).min().unwrap_or(0);
    let points = (0..len)
        .map(|i| {
            let mut merged = ForecastPoint {
                timestamp: results[0].points[i].timestamp,
                predicted: 0.0,
                lower: 0.0,
                upper: 0.0,
            };
            for (r, (_, w)) in results.iter().zip(&weights) {
                let p = &r.points[i];
                merged.predicted += w * p.predicted;
                merged.lower += w * p.lower;
                merged.upper += w * p.upper;
            }
            merged
        })
        .collect();

    let metrics = ModelMetrics {
        accuracy: results
            .iter()
            .map(|r| r.metrics.accuracy)
            .fold(f64::NEG_INFINITY, f64::max),
        mae: min_metric(results, |m| m.mae) * 0.9,
        rmse: min_metric(results, |m| m.rmse) * 0.9,
        mape: min_metric(results, |m| m.mape) * 0.9,
    };

    Some(EnsembleForecast {
        points,
        weights,
        metrics,
    })
}

fn min_metric(results: &[ForecastResult], f: impl Fn(&ModelMetrics) -> f64) -> f64 {
    results
        .iter()
        .map(|r| f(&r.metrics))
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::projector::get_all_forecasts;
    use crate::types::{ProjectorKind, TimePoint};
    use chrono::{Duration, TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn result(kind: ProjectorKind, accuracy: f64, mae: f64, values: &[f64]) -> ForecastResult {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        ForecastResult {
            projector: kind,
            points: values
                .iter()
                .enumerate()
                .map(|(i, v)| ForecastPoint {
                    timestamp: t0 + Duration::days(i as i64),
                    predicted: *v,
                    lower: v - 1.0,
                    upper: v + 1.0,
                })
                .collect(),
            metrics: ModelMetrics {
                accuracy,
                mae,
                rmse: mae + 1.0,
                mape: mae + 2.0,
            },
            slope: 0.0,
        }
    }

    #[test]
    fn test_weighted_average_by_accuracy() {
        let a = result(ProjectorKind::ShortTerm, 75.0, 2.0, &[10.0, 20.0, 30.0]);
        let b = result(ProjectorKind::Blended, 25.0, 4.0, &[50.0, 60.0]);
        let e = create_ensemble_forecast(&[a, b]).unwrap();

        assert_eq!(e.points.len(), 2);
        assert!((e.points[0].predicted - (0.75 * 10.0 + 0.25 * 50.0)).abs() < 1e-9);
        assert!((e.points[1].lower - (0.75 * 19.0 + 0.25 * 59.0)).abs() < 1e-9);
        assert_eq!(e.weights[0], (ProjectorKind::ShortTerm, 0.75));
        assert_eq!(e.metrics.accuracy, 75.0);
        assert!((e.metrics.mae - 1.8).abs() < 1e-9);
        assert!((e.metrics.mape - 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_presets_ensemble() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let history: Vec<_> = (0..30)
            .map(|i| TimePoint::new(t0 + Duration::days(i), 55.0))
            .collect();
        let forecasts = get_all_forecasts(&history, 7, &mut StdRng::seed_from_u64(11));
        let e = create_ensemble_forecast(&forecasts).unwrap();
        assert_eq!(e.points.len(), 7);
        let weight_sum: f64 = e.weights.iter().map(|(_, w)| w).sum();
        assert!((weight_sum - 1.0).abs() < 1e-9);
        assert_eq!(e.metrics.accuracy, 94.2);
        assert!((e.metrics.mae - 2.1 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        assert!(create_ensemble_forecast(&[]).is_none());
    }
}
