//! Trend delta and volatility over an ordered series.

use super::stats::{mean, population_std_dev, values};
use crate::types::{TimePoint, TrendDelta, TrendDirection};

/// Compare the mean of the most recent window with the preceding window.
///
/// The window is `min(max_window, n / 2)` points so short series still
/// compare their two halves. Returns `None` for fewer than two points. A zero
/// previous mean yields a neutral 0% change. Rising HMPI is deteriorating.
pub fn analyze_trend(series: &[TimePoint], max_window: usize) -> Option<TrendDelta> {
    let window = max_window.min(series.len() / 2);
    if window == 0 {
        return None;
    }

    let vals = values(series);
    let n = vals.len();
    let recent_mean = mean(&vals[n - window..])?;
    let previous_mean = mean(&vals[n - 2 * window..n - window])?;

    let trend_change = if previous_mean.abs() < f64::EPSILON {
        0.0
    } else {
        (recent_mean - previous_mean) / previous_mean.abs() * 100.0
    };

    let direction = if trend_change > 0.0 {
        TrendDirection::Deteriorating
    } else if trend_change < 0.0 {
        TrendDirection::Improving
    } else {
        TrendDirection::Stable
    };

    Some(TrendDelta {
        recent_mean,
        previous_mean,
        trend_change,
        window,
        direction,
    })
}

/// Population σ of the last `window` points. `None` for fewer than two.
pub fn volatility(series: &[TimePoint], window: usize) -> Option<f64> {
    let take = window.min(series.len());
    if take < 2 {
        return None;
    }
    population_std_dev(&values(&series[series.len() - take..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series(vals: &[f64]) -> Vec<TimePoint> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        vals.iter()
            .enumerate()
            .map(|(i, v)| TimePoint::new(t0 + Duration::days(i as i64), *v))
            .collect()
    }

    #[test]
    fn test_rising_series_deteriorates() {
        let t = analyze_trend(&series(&[45.0, 52.0, 63.0, 76.0, 91.0, 108.0]), 14).unwrap();
        assert_eq!(t.window, 3);
        assert!(t.trend_change > 70.0);
        assert_eq!(t.direction, TrendDirection::Deteriorating);
    }

    #[test]
    fn test_full_windows_when_long_enough() {
        let mut vals = vec![100.0; 14];
        vals.extend(vec![90.0; 14]);
        vals.insert(0, 500.0); // outside both windows
        let t = analyze_trend(&series(&vals), 14).unwrap();
        assert_eq!(t.window, 14);
        assert!((t.trend_change + 10.0).abs() < 1e-9);
        assert_eq!(t.direction, TrendDirection::Improving);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(analyze_trend(&series(&[]), 14).is_none());
        assert!(analyze_trend(&series(&[5.0]), 14).is_none());
        let flat = analyze_trend(&series(&[0.0, 0.0, 3.0, 3.0]), 14).unwrap();
        assert_eq!(flat.trend_change, 0.0);
        assert_eq!(flat.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_volatility_recent_window_only() {
        let vals = [1000.0, 2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let v = volatility(&series(&vals), 8).unwrap();
        assert!((v - 2.0).abs() < 1e-12);
        assert!(volatility(&series(&[1.0]), 8).is_none());
    }
}
