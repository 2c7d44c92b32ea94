//! Historical data fixture
//!
//! Six monthly readings for one location with a monotonically rising HMPI.
//! Used by the tests and by `--seed-history` to give the analyzers something
//! to work with before the first live poll.

use chrono::{DateTime, Duration, Months, Utc};

use crate::index::{uniform_metals, MetalLimits};
use crate::types::{WaterParameters, WaterQualityReading};

pub const HISTORICAL_HMPI: [f64; 6] = [45.0, 52.0, 63.0, 76.0, 91.0, 108.0];

pub const FIXTURE_SOURCE: &str = "Historical Fixture";

/// One reading per month starting at `start`, oldest first.
pub fn generate_historical_data(location: &str, start: DateTime<Utc>) -> Vec<WaterQualityReading> {
    let limits = MetalLimits::default();
    HISTORICAL_HMPI
        .iter()
        .enumerate()
        .map(|(i, &hmpi)| {
            let months = i as u32;
            let timestamp = start
                .checked_add_months(Months::new(months))
                .unwrap_or_else(|| start + Duration::days(30 * i64::from(months)));
            WaterQualityReading {
                location: location.to_string(),
                latitude: None,
                longitude: None,
                timestamp,
                hmpi,
                metals: uniform_metals(hmpi, &limits),
                parameters: WaterParameters {
                    temperature: Some(24.0 + i as f64),
                    ph: Some(7.4 - 0.1 * i as f64),
                    turbidity: None,
                    dissolved_oxygen: None,
                },
                source: FIXTURE_SOURCE.to_string(),
                synthetic: true,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::compute_hmpi;
    use chrono::TimeZone;

    #[test]
    fn test_fixture_shape() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let data = generate_historical_data("Yamuna River, Delhi", start);
        let limits = MetalLimits::default();

        assert_eq!(data.len(), 6);
        assert!(data.windows(2).all(|w| w[0].hmpi < w[1].hmpi));
        assert!(data.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(data[5].timestamp, Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap());
        for r in &data {
            assert!((compute_hmpi(&r.metals, &limits) - r.hmpi).abs() < 1e-9);
        }
    }
}
