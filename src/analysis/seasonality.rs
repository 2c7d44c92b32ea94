//! Weekly seasonality: mean value per day of week.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::config::defaults::MIN_POINTS_FOR_SEASONALITY;
use crate::types::TimePoint;

/// Per-weekday means, Monday = 0 .. Sunday = 6. Days with no data are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyProfile {
    pub means: [Option<f64>; 7],
    /// Highest minus lowest weekday mean.
    pub spread: f64,
    pub peak_day: usize,
    pub low_day: usize,
}

pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Weekday profile of `series`. `None` below 30 points.
pub fn weekly_seasonality(series: &[TimePoint]) -> Option<WeeklyProfile> {
    if series.len() < MIN_POINTS_FOR_SEASONALITY {
        return None;
    }

    let mut sums = [(0.0_f64, 0usize); 7];
    for p in series {
        let day = p.timestamp.weekday().num_days_from_monday() as usize;
        sums[day].0 += p.value;
        sums[day].1 += 1;
    }

    let means = sums.map(|(sum, n)| (n > 0).then(|| sum / n as f64));
    let present = means
        .iter()
        .enumerate()
        .filter_map(|(day, m)| m.map(|m| (day, m)));

    let (mut peak_day, mut peak) = (0, f64::MIN);
    let (mut low_day, mut low) = (0, f64::MAX);
    for (day, m) in present {
        if m > peak {
            (peak_day, peak) = (day, m);
        }
        if m < low {
            (low_day, low) = (day, m);
        }
    }

    Some(WeeklyProfile {
        means,
        spread: peak - low,
        peak_day,
        low_day,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_requires_thirty_points() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let short: Vec<_> = (0..29)
            .map(|i| TimePoint::new(t0 + Duration::days(i), 1.0))
            .collect();
        assert!(weekly_seasonality(&short).is_none());
    }

    #[test]
    fn test_weekend_dip() {
        // 2024-01-01 is a Monday
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let series: Vec<_> = (0..35)
            .map(|i| {
                let ts = t0 + Duration::days(i);
                let v = if ts.weekday().num_days_from_monday() >= 5 { 40.0 } else { 60.0 };
                TimePoint::new(ts, v)
            })
            .collect();
        let profile = weekly_seasonality(&series).unwrap();
        assert_eq!(profile.means[0], Some(60.0));
        assert_eq!(profile.means[6], Some(40.0));
        assert!((profile.spread - 20.0).abs() < 1e-9);
        assert_eq!(profile.peak_day, 0);
        assert_eq!(profile.low_day, 5);
    }
}
