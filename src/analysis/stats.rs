//! Descriptive statistics shared by the analyzers.
//!
//! Thin wrappers over `statrs::statistics::Statistics` that return `None`
//! instead of NaN for degenerate input.

use statrs::statistics::Statistics;

use crate::types::TimePoint;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let m = values.iter().mean();
    m.is_finite().then_some(m)
}

/// Population standard deviation (divides by n).
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sd = values.iter().population_std_dev();
    sd.is_finite().then_some(sd)
}

/// Least-squares slope of `values` against their index (units per sample).
/// Zero for fewer than two points.
pub fn least_squares_slope(values: &[f64]) -> f64 {
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    fit_slope(&xs, values)
}

/// Least-squares slope of a series against elapsed time, in units per day.
///
/// Samples may be irregular (hourly buckets, monthly fixtures); the fit uses
/// their real spacing. Zero for fewer than two points or a single timestamp.
pub fn slope_per_day(series: &[TimePoint]) -> f64 {
    let Some(first) = series.first() else {
        return 0.0;
    };
    let xs: Vec<f64> = series
        .iter()
        .map(|p| (p.timestamp - first.timestamp).num_seconds() as f64 / SECONDS_PER_DAY)
        .collect();
    fit_slope(&xs, &values(series))
}

const SECONDS_PER_DAY: f64 = 86_400.0;

fn fit_slope(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let x_mean = xs[..n].iter().sum::<f64>() / n as f64;
    let y_mean = ys[..n].iter().sum::<f64>() / n as f64;

    let (num, den) = xs[..n]
        .iter()
        .zip(&ys[..n])
        .fold((0.0, 0.0), |(num, den), (x, y)| {
            let dx = x - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });

    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

pub fn values(series: &[TimePoint]) -> Vec<f64> {
    series.iter().map(|p| p.value).collect()
}
