//! Time-Series Store
//!
//! In-memory rolling buffer of normalized readings plus the current batch.
//!
//! - The buffer is kept in non-decreasing timestamp order and capped; on
//!   overflow the oldest readings are evicted.
//! - `append` inspects only the new batch when raising alerts, so history is
//!   never re-alerted on later polls.
//! - The current batch is replaced wholesale on every append.

mod alerts;

pub use alerts::AlertLog;

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Duration, DurationRound, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::StoreConfig;
use crate::types::{
    Alert, AlertSeverity, AlertType, MetalSample, TimePoint, WaterQualityReading,
};

pub struct TimeSeriesStore {
    buffer: VecDeque<WaterQualityReading>,
    current: Vec<WaterQualityReading>,
    capacity: usize,
    warning_alert_probability: f64,
    rng: StdRng,
}

impl TimeSeriesStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Store with an explicit RNG for the probabilistic warning alerts.
    pub fn with_rng(config: &StoreConfig, rng: StdRng) -> Self {
        let capacity = config.max_readings.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            current: Vec::new(),
            capacity,
            warning_alert_probability: config.warning_alert_probability.clamp(0.0, 1.0),
            rng,
        }
    }

    pub fn with_seed(config: &StoreConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    /// Append a batch, returning the alerts it raised.
    ///
    /// Every critical metal raises a critical `threshold_exceeded` alert.
    /// Every warning metal raises a medium `pollution_spike` alert with the
    /// configured probability.
    pub fn append(&mut self, batch: Vec<WaterQualityReading>) -> Vec<Alert> {
        let alerts = self.alerts_for(&batch);

        for reading in &batch {
            self.insert_ordered(reading.clone());
        }
        let evicted = self.evict_overflow();
        self.current = batch;

        debug!(
            appended = self.current.len(),
            evicted,
            buffered = self.buffer.len(),
            alerts = alerts.len(),
            "Store append"
        );
        alerts
    }

    /// Insert readings into the history buffer only. No alerts are raised
    /// and the current batch is left untouched.
    pub fn seed_history(&mut self, readings: Vec<WaterQualityReading>) {
        for reading in readings {
            self.insert_ordered(reading);
        }
        self.evict_overflow();
    }

    fn evict_overflow(&mut self) -> usize {
        let mut evicted = 0usize;
        while self.buffer.len() > self.capacity {
            self.buffer.pop_front();
            evicted += 1;
        }
        evicted
    }

    fn alerts_for(&mut self, batch: &[WaterQualityReading]) -> Vec<Alert> {
        let mut alerts = Vec::new();
        for reading in batch {
            for metal in reading.critical_metals() {
                alerts.push(Alert::new(
                    AlertType::ThresholdExceeded,
                    AlertSeverity::Critical,
                    format!(
                        "{} at {:.2} {} exceeds 1.5x its regulatory limit",
                        metal.metal, metal.value, metal.unit
                    ),
                    &reading.location,
                    reading.timestamp,
                ));
            }
            for metal in reading.warning_metals() {
                if self.rng.gen_bool(self.warning_alert_probability) {
                    alerts.push(Alert::new(
                        AlertType::PollutionSpike,
                        AlertSeverity::Medium,
                        format!(
                            "{} rising above its regulatory limit ({:.2} {})",
                            metal.metal, metal.value, metal.unit
                        ),
                        &reading.location,
                        reading.timestamp,
                    ));
                }
            }
        }
        alerts
    }

    fn insert_ordered(&mut self, reading: WaterQualityReading) {
        match self.buffer.back() {
            Some(last) if reading.timestamp < last.timestamp => {
                let at = self
                    .buffer
                    .partition_point(|r| r.timestamp <= reading.timestamp);
                self.buffer.insert(at, reading);
            }
            _ => self.buffer.push_back(reading),
        }
    }

    /// The most recent batch, as returned by the gateway.
    pub fn current(&self) -> &[WaterQualityReading] {
        &self.current
    }

    /// Buffered readings in time order, optionally for one location.
    pub fn query(&self, location: Option<&str>) -> Vec<WaterQualityReading> {
        self.buffer
            .iter()
            .filter(|r| location.map_or(true, |l| r.location.eq_ignore_ascii_case(l)))
            .cloned()
            .collect()
    }

    /// Newest buffered reading for a location.
    pub fn latest(&self, location: &str) -> Option<&WaterQualityReading> {
        self.buffer
            .iter()
            .rev()
            .find(|r| r.location.eq_ignore_ascii_case(location))
    }

    /// Values of `metal` over the last `window_hours`, in time order.
    ///
    /// The window is anchored at the newest buffered reading, not wall-clock
    /// time.
    pub fn trend(&self, metal: &str, window_hours: u32) -> Vec<MetalSample> {
        let Some(newest) = self.newest_timestamp() else {
            return Vec::new();
        };
        let cutoff = newest - Duration::hours(i64::from(window_hours));

        self.buffer
            .iter()
            .filter(|r| r.timestamp >= cutoff)
            .filter_map(|r| {
                r.metal(metal).map(|m| MetalSample {
                    timestamp: r.timestamp,
                    location: r.location.clone(),
                    reading: m.clone(),
                    synthetic: r.synthetic,
                })
            })
            .collect()
    }

    /// HMPI series, optionally for one location.
    pub fn hmpi_series(&self, location: Option<&str>) -> Vec<TimePoint> {
        self.buffer
            .iter()
            .filter(|r| location.map_or(true, |l| r.location.eq_ignore_ascii_case(l)))
            .map(|r| TimePoint::new(r.timestamp, r.hmpi))
            .collect()
    }

    /// Concentration series of one metal across all locations.
    pub fn metal_series(&self, metal: &str) -> Vec<TimePoint> {
        self.buffer
            .iter()
            .filter_map(|r| r.metal(metal).map(|m| TimePoint::new(r.timestamp, m.value)))
            .collect()
    }

    /// Every buffered reading in time order.
    pub fn readings(&self) -> impl Iterator<Item = &WaterQualityReading> {
        self.buffer.iter()
    }

    /// True when any buffered reading came from the fallback generator or
    /// fixture history.
    pub fn has_synthetic(&self) -> bool {
        self.buffer.iter().any(|r| r.synthetic)
    }

    pub fn newest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.buffer.back().map(|r| r.timestamp)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Network-wide HMPI: mean over all locations per hour bucket, time ordered.
pub fn network_series<'a, I>(readings: I) -> Vec<TimePoint>
where
    I: IntoIterator<Item = &'a WaterQualityReading>,
{
    let mut buckets: BTreeMap<DateTime<Utc>, (f64, usize)> = BTreeMap::new();
    for r in readings {
        let hour = r
            .timestamp
            .duration_trunc(Duration::hours(1))
            .unwrap_or(r.timestamp);
        let entry = buckets.entry(hour).or_insert((0.0, 0));
        entry.0 += r.hmpi;
        entry.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(ts, (sum, n))| TimePoint::new(ts, sum / n as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{uniform_metals, MetalLimits};
    use chrono::TimeZone;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn reading(location: &str, minutes: i64, hmpi: f64) -> WaterQualityReading {
        WaterQualityReading {
            location: location.to_string(),
            latitude: None,
            longitude: None,
            timestamp: base_time() + Duration::minutes(minutes),
            hmpi,
            metals: uniform_metals(hmpi, &MetalLimits::default()),
            parameters: Default::default(),
            source: "test".to_string(),
            synthetic: false,
        }
    }

    fn store() -> TimeSeriesStore {
        TimeSeriesStore::with_seed(&StoreConfig::default(), 5)
    }

    #[test]
    fn test_critical_metal_raises_critical_alert() {
        let mut store = store();
        // ratio 1.6 on every metal → all critical
        let alerts = store.append(vec![reading("Delhi", 0, 160.0)]);
        assert!(!alerts.is_empty());
        assert!(alerts.iter().any(|a| a.severity == AlertSeverity::Critical));
        assert!(alerts
            .iter()
            .all(|a| a.alert_type == AlertType::ThresholdExceeded && a.location == "Delhi"));
    }

    #[test]
    fn test_normal_metals_raise_no_alerts() {
        let mut config = StoreConfig::default();
        // even a certain warning branch cannot fire for normal metals
        config.warning_alert_probability = 1.0;
        let mut store = TimeSeriesStore::with_seed(&config, 1);
        for i in 0..20 {
            assert!(store.append(vec![reading("Delhi", i, 40.0)]).is_empty());
        }
    }

    #[test]
    fn test_warning_alerts_follow_probability() {
        let mut config = StoreConfig::default();
        config.warning_alert_probability = 1.0;
        let mut always = TimeSeriesStore::with_seed(&config, 1);
        // ratio 1.2 → warning on all five metals
        let alerts = always.append(vec![reading("Delhi", 0, 120.0)]);
        assert_eq!(alerts.len(), 5);
        assert!(alerts.iter().all(|a| a.alert_type == AlertType::PollutionSpike));
        assert!(alerts.iter().all(|a| a.severity == AlertSeverity::Medium));

        config.warning_alert_probability = 0.0;
        let mut never = TimeSeriesStore::with_seed(&config, 1);
        assert!(never.append(vec![reading("Delhi", 0, 120.0)]).is_empty());
    }

    #[test]
    fn test_alerts_only_for_new_batch() {
        let mut store = store();
        assert!(!store.append(vec![reading("Delhi", 0, 160.0)]).is_empty());
        assert!(store.append(vec![reading("Delhi", 1, 20.0)]).is_empty());
    }

    #[test]
    fn test_capacity_keeps_most_recent() {
        let mut store = store();
        for i in 0..1050 {
            store.append(vec![reading("Delhi", i, 20.0)]);
        }
        assert_eq!(store.len(), 1000);
        let history = store.query(None);
        assert_eq!(history[0].timestamp, base_time() + Duration::minutes(50));
        assert_eq!(
            history.last().unwrap().timestamp,
            base_time() + Duration::minutes(1049)
        );
    }

    #[test]
    fn test_capacity_with_one_large_batch() {
        let mut store = store();
        let batch: Vec<_> = (0..1050).rev().map(|i| reading("Delhi", i, 20.0)).collect();
        store.append(batch);
        assert_eq!(store.len(), 1000);
        assert_eq!(store.query(None)[0].timestamp, base_time() + Duration::minutes(50));
    }

    #[test]
    fn test_out_of_order_inserts_stay_sorted() {
        let mut store = store();
        store.append(vec![reading("A", 10, 20.0), reading("B", 5, 20.0)]);
        store.append(vec![reading("C", 7, 20.0)]);
        let series = store.hmpi_series(None);
        assert!(series.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_trend_window_anchored_at_newest() {
        let mut store = store();
        for i in 0..10 {
            store.append(vec![reading("Delhi", i * 60, 20.0 + i as f64)]);
        }
        let samples = store.trend("lead", 3);
        assert_eq!(samples.len(), 4, "hours 6..=9");
        assert!(samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(samples[0].reading.metal, "Lead");
        assert!(store.trend("unobtainium", 100).is_empty());
    }

    #[test]
    fn test_current_batch_replaced_wholesale() {
        let mut store = store();
        store.append(vec![reading("A", 0, 20.0), reading("B", 0, 20.0)]);
        store.append(vec![reading("C", 1, 20.0)]);
        assert_eq!(store.current().len(), 1);
        assert_eq!(store.current()[0].location, "C");
        assert_eq!(store.latest("a").unwrap().location, "A");
        assert_eq!(store.query(Some("B")).len(), 1);
    }

    #[test]
    fn test_seed_history_is_silent() {
        let mut store = store();
        store.append(vec![reading("Live", 500, 20.0)]);
        store.seed_history((0..5).map(|i| reading("Seed", i, 160.0)).collect());
        assert_eq!(store.len(), 6);
        assert_eq!(store.current()[0].location, "Live");
        assert_eq!(store.query(None)[0].location, "Seed");
    }

    #[test]
    fn test_network_series_hourly_mean() {
        let readings = vec![
            reading("A", 0, 10.0),
            reading("B", 30, 30.0),
            reading("A", 60, 50.0),
        ];
        let series = network_series(&readings);
        assert_eq!(series.len(), 2);
        assert!((series[0].value - 20.0).abs() < 1e-9);
        assert!((series[1].value - 50.0).abs() < 1e-9);
    }
}
