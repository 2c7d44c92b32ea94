//! Parameterized HMPI projector
//!
//! One projector type covers the three presets. Each forecast point is
//!
//! ```text
//! predicted = max(0, last + slope × d + seasonal(ts) + noise × last × u),  u ∈ [-1, 1]
//! lower     = predicted × (1 - lower_band)
//! upper     = predicted × (1 + upper_band)
//! ```
//!
//! where `slope` is the least-squares slope (HMPI per day, fitted against
//! the sample timestamps) over the last `trend_window` points. The presets
//! differ only in window, seasonal table, noise and band widths. Error
//! metrics are nominal constants, not measured.

use chrono::{DateTime, Datelike, Duration, Utc};
use rand::Rng;

use super::stats::slope_per_day;
use crate::types::{ForecastPoint, ForecastResult, ModelMetrics, ProjectorKind, TimePoint};

/// Fixed seasonal offsets, in HMPI points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeasonalTable {
    /// Monday = 0 .. Sunday = 6.
    Weekly([f64; 7]),
    /// January = 0 .. December = 11.
    Monthly([f64; 12]),
}

impl SeasonalTable {
    pub fn offset(&self, ts: DateTime<Utc>) -> f64 {
        match self {
            SeasonalTable::Weekly(t) => t[ts.weekday().num_days_from_monday() as usize],
            SeasonalTable::Monthly(t) => t[ts.month0() as usize],
        }
    }
}

const SHORT_TERM_WEEKLY: [f64; 7] = [0.0, 1.5, 2.0, 1.0, 0.5, -1.5, -2.5];
const BLENDED_WEEKLY: [f64; 7] = [0.0, 0.8, 1.0, 0.6, 0.2, -0.8, -1.2];
// Pre-monsoon concentration peak, monsoon dilution
const SEASONAL_MONTHLY: [f64; 12] = [3.0, 4.0, 5.0, 6.0, 7.0, 2.0, -6.0, -8.0, -5.0, 0.0, 2.0, 3.0];

#[derive(Debug, Clone, PartialEq)]
pub struct Projector {
    pub kind: ProjectorKind,
    pub trend_window: usize,
    pub seasonal: SeasonalTable,
    /// Fraction of the last value used as the noise amplitude.
    pub noise: f64,
    pub lower_band: f64,
    pub upper_band: f64,
    pub metrics: ModelMetrics,
}

impl Projector {
    pub fn short_term() -> Self {
        Self {
            kind: ProjectorKind::ShortTerm,
            trend_window: 7,
            seasonal: SeasonalTable::Weekly(SHORT_TERM_WEEKLY),
            noise: 0.02,
            lower_band: 0.08,
            upper_band: 0.12,
            metrics: ModelMetrics {
                accuracy: 94.2,
                mae: 2.1,
                rmse: 2.8,
                mape: 3.2,
            },
        }
    }

    pub fn seasonal() -> Self {
        Self {
            kind: ProjectorKind::Seasonal,
            trend_window: 30,
            seasonal: SeasonalTable::Monthly(SEASONAL_MONTHLY),
            noise: 0.03,
            lower_band: 0.10,
            upper_band: 0.15,
            metrics: ModelMetrics {
                accuracy: 91.8,
                mae: 2.6,
                rmse: 3.4,
                mape: 4.1,
            },
        }
    }

    pub fn blended() -> Self {
        Self {
            kind: ProjectorKind::Blended,
            trend_window: 14,
            seasonal: SeasonalTable::Weekly(BLENDED_WEEKLY),
            noise: 0.04,
            lower_band: 0.12,
            upper_band: 0.18,
            metrics: ModelMetrics {
                accuracy: 89.5,
                mae: 3.1,
                rmse: 4.0,
                mape: 4.9,
            },
        }
    }

    pub fn for_kind(kind: ProjectorKind) -> Self {
        match kind {
            ProjectorKind::ShortTerm => Self::short_term(),
            ProjectorKind::Seasonal => Self::seasonal(),
            ProjectorKind::Blended => Self::blended(),
        }
    }

    pub fn presets() -> [Projector; 3] {
        [Self::short_term(), Self::seasonal(), Self::blended()]
    }

    /// Project `horizon_days` daily points past the newest history point.
    ///
    /// `None` for an empty history or a zero horizon.
    pub fn forecast<R: Rng>(
        &self,
        history: &[TimePoint],
        horizon_days: u32,
        rng: &mut R,
    ) -> Option<ForecastResult> {
        let last = history.last()?;
        if horizon_days == 0 {
            return None;
        }

        let start = history.len().saturating_sub(self.trend_window);
        let slope = slope_per_day(&history[start..]);
        let base = last.value.max(0.0);

        let points = (1..=horizon_days)
            .map(|d| {
                let timestamp = last.timestamp + Duration::days(i64::from(d));
                let noise = self.noise * base * rng.gen_range(-1.0..=1.0);
                let predicted = (last.value
                    + slope * f64::from(d)
                    + self.seasonal.offset(timestamp)
                    + noise)
                    .max(0.0);
                ForecastPoint {
                    timestamp,
                    predicted,
                    lower: predicted * (1.0 - self.lower_band),
                    upper: predicted * (1.0 + self.upper_band),
                }
            })
            .collect();

        Some(ForecastResult {
            projector: self.kind,
            points,
            metrics: self.metrics,
            slope,
        })
    }
}

/// Run every preset over the same history.
pub fn get_all_forecasts<R: Rng>(
    history: &[TimePoint],
    horizon_days: u32,
    rng: &mut R,
) -> Vec<ForecastResult> {
    Projector::presets()
        .iter()
        .filter_map(|p| p.forecast(history, horizon_days, rng))
        .collect()
}
