//! Polling loop: gateway → store → alerts → insights → events.
//!
//! Ticks every refresh interval. A poll still in flight when the next tick
//! fires is left to finish and the tick is skipped; polls are never cancelled
//! mid-flight except on shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ConnectionStatus, MonitorEvent, MonitorHandle};
use crate::aggregation::AggregationGateway;
use crate::insights::InsightSynthesizer;
use crate::types::{Alert, AlertSeverity, AlertType};

/// Location recorded on alerts that concern the whole pipeline.
pub const SYSTEM_LOCATION: &str = "system";

/// What one completed poll did.
#[derive(Debug, Clone, Serialize)]
pub struct PollOutcome {
    pub success: bool,
    pub source: String,
    pub synthetic: bool,
    pub readings: usize,
    pub alerts: usize,
    pub insights: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Poller {
    gateway: Arc<AggregationGateway>,
    synthesizer: InsightSynthesizer,
    handle: MonitorHandle,
    interval: Duration,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a poll ends, including on panic or drop.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Poller {
    pub fn new(
        gateway: Arc<AggregationGateway>,
        synthesizer: InsightSynthesizer,
        handle: MonitorHandle,
        interval: Duration,
    ) -> Self {
        Self {
            gateway,
            synthesizer,
            handle,
            interval,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn handle(&self) -> &MonitorHandle {
        &self.handle
    }

    pub fn is_polling(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run until `cancel` fires. The first poll happens immediately.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_ms = self.interval.as_millis() as u64, "Poller started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[Poller] Shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    let poller = Arc::clone(&self);
                    tokio::spawn(async move {
                        poller.poll_once().await;
                    });
                }
            }
        }
    }

    /// Run a single poll cycle.
    ///
    /// Returns `None` when another poll is already in flight.
    pub async fn poll_once(&self) -> Option<PollOutcome> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Previous poll still in flight, skipping tick");
            self.handle.write().await.polls_skipped += 1;
            return None;
        }
        let _guard = InFlightGuard(&self.in_flight);

        let result = self.gateway.fetch_real_time_data().await;

        if result.success && result.has_data() {
            Some(self.ingest(result).await)
        } else {
            let error = result
                .error
                .clone()
                .unwrap_or_else(|| "no data returned".to_string());
            Some(self.record_failure(&result.source, error).await)
        }
    }

    async fn ingest(&self, result: crate::sources::FetchResult) -> PollOutcome {
        let readings = result.data.len();
        let (alerts, insights) = {
            let mut state = self.handle.write().await;
            let alerts = state.store.append(result.data);
            state.alerts.extend(alerts.iter().cloned());
            state.alerts_raised += alerts.len() as u64;

            state.current_source = Some(result.source.clone());
            state.current_synthetic = result.synthetic;
            state.status = if result.synthetic {
                ConnectionStatus::Simulated
            } else {
                ConnectionStatus::Live
            };
            state.last_poll = Some(Utc::now());
            state.last_error = None;
            state.polls_completed += 1;

            let insights = state.refresh_insights(&self.synthesizer);
            (alerts, insights)
        };

        self.handle.publish(MonitorEvent::ReadingsUpdated {
            source: result.source.clone(),
            synthetic: result.synthetic,
            count: readings,
        });
        for alert in &alerts {
            self.handle.publish(MonitorEvent::AlertRaised(alert.clone()));
        }
        self.handle
            .publish(MonitorEvent::InsightsRefreshed { total: insights });

        info!(
            source = %result.source,
            synthetic = result.synthetic,
            readings,
            alerts = alerts.len(),
            insights,
            "Poll complete"
        );

        PollOutcome {
            success: true,
            source: result.source,
            synthetic: result.synthetic,
            readings,
            alerts: alerts.len(),
            insights,
            error: None,
        }
    }

    /// Total failure with fallback disabled. The current batch keeps its
    /// previous contents; one system alert is raised per transition into the
    /// disconnected state.
    async fn record_failure(&self, source: &str, error: String) -> PollOutcome {
        let raised = {
            let mut state = self.handle.write().await;
            state.polls_failed += 1;
            state.last_poll = Some(Utc::now());
            state.last_error = Some(error.clone());

            if state.status == ConnectionStatus::Disconnected {
                None
            } else {
                state.status = ConnectionStatus::Disconnected;
                let alert = Alert::new(
                    AlertType::SystemFailure,
                    AlertSeverity::High,
                    format!("All data sources failed: {error}"),
                    SYSTEM_LOCATION,
                    Utc::now(),
                );
                state.alerts.push(alert.clone());
                state.alerts_raised += 1;
                Some(alert)
            }
        };

        warn!(source = %source, error = %error, "Poll failed, no data available");

        let alerts = usize::from(raised.is_some());
        if let Some(alert) = raised {
            self.handle.publish(MonitorEvent::Disconnected {
                error: error.clone(),
            });
            self.handle.publish(MonitorEvent::AlertRaised(alert));
        }

        PollOutcome {
            success: false,
            source: source.to_string(),
            synthetic: false,
            readings: 0,
            alerts,
            insights: 0,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, MonitorConfig};
    use crate::index::{uniform_metals, MetalLimits};
    use crate::pipeline::MonitorState;
    use crate::sources::{FallbackGenerator, RawPayload, SourceAdapter, SourceError};
    use crate::types::WaterQualityReading;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct FixedAdapter {
        hmpi: Option<f64>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl FixedAdapter {
        fn new(hmpi: Option<f64>) -> Self {
            Self {
                hmpi,
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl SourceAdapter for FixedAdapter {
        fn label(&self) -> &str {
            "Fixed"
        }

        async fn fetch(&self) -> Result<RawPayload, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.hmpi {
                Some(h) => Ok(serde_json::json!({ "hmpi": h })),
                None => Err(SourceError::UpstreamStatus {
                    status: 500,
                    body: "down".to_string(),
                }),
            }
        }

        fn normalize(&self, raw: RawPayload) -> Result<Vec<WaterQualityReading>, SourceError> {
            let hmpi = raw["hmpi"].as_f64().unwrap_or_default();
            Ok(vec![WaterQualityReading {
                location: "Site".to_string(),
                latitude: None,
                longitude: None,
                timestamp: Utc::now(),
                hmpi,
                metals: uniform_metals(hmpi, &MetalLimits::default()),
                parameters: Default::default(),
                source: "Fixed".to_string(),
                synthetic: false,
            }])
        }
    }

    fn poller(adapter: Arc<FixedAdapter>, fallback: bool) -> Poller {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![adapter];
        let generator = fallback.then(|| FallbackGenerator::with_seed(MetalLimits::default(), 3));
        let gateway = Arc::new(AggregationGateway::new(adapters, generator));
        let handle = MonitorHandle::new(MonitorState::new(&MonitorConfig::default()));
        Poller::new(
            gateway,
            InsightSynthesizer::new(AnalysisConfig::default()),
            handle,
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn test_live_poll_updates_state_and_events() {
        let p = poller(Arc::new(FixedAdapter::new(Some(160.0))), true);
        let mut rx = p.handle().subscribe();

        let outcome = p.poll_once().await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.source, "Fixed");
        assert_eq!(outcome.readings, 1);
        assert!(outcome.alerts > 0);

        let state = p.handle().read().await;
        assert_eq!(state.status, ConnectionStatus::Live);
        assert_eq!(state.store.len(), 1);
        assert!(!state.alerts.is_empty());
        assert!(!state.insights.is_empty());
        assert!(!state.summary.based_on_simulated_data);
        drop(state);

        match rx.recv().await.unwrap() {
            MonitorEvent::ReadingsUpdated { source, synthetic, count } => {
                assert_eq!(source, "Fixed");
                assert!(!synthetic);
                assert_eq!(count, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fallback_poll_is_simulated() {
        let p = poller(Arc::new(FixedAdapter::new(None)), true);
        let outcome = p.poll_once().await.unwrap();
        assert!(outcome.success);
        assert!(outcome.synthetic);
        assert!(outcome.source.contains("Fallback"));
        let state = p.handle().read().await;
        assert_eq!(state.status, ConnectionStatus::Simulated);
        assert!(state.insights.iter().all(|i| i.derived_from_simulated));
    }

    #[tokio::test]
    async fn test_disconnect_raises_one_alert_per_transition() {
        let p = poller(Arc::new(FixedAdapter::new(None)), false);
        for _ in 0..3 {
            let outcome = p.poll_once().await.unwrap();
            assert!(!outcome.success);
        }
        let state = p.handle().read().await;
        assert_eq!(state.status, ConnectionStatus::Disconnected);
        assert_eq!(state.polls_failed, 3);
        let system: Vec<_> = state
            .alerts
            .iter()
            .filter(|a| a.alert_type == AlertType::SystemFailure)
            .collect();
        assert_eq!(system.len(), 1);
        assert_eq!(system[0].severity, AlertSeverity::High);
        assert!(state.store.current().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_poll_is_skipped() {
        let adapter = Arc::new(FixedAdapter {
            delay: Duration::from_millis(200),
            ..FixedAdapter::new(Some(20.0))
        });
        let p = Arc::new(poller(Arc::clone(&adapter), true));

        let first = {
            let p = Arc::clone(&p);
            tokio::spawn(async move { p.poll_once().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(p.is_polling());
        assert!(p.poll_once().await.is_none());

        assert!(first.await.unwrap().is_some());
        assert!(!p.is_polling());
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(p.handle().read().await.polls_skipped, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let adapter = Arc::new(FixedAdapter::new(Some(20.0)));
        let p = Arc::new(poller(Arc::clone(&adapter), true));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Arc::clone(&p).run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(120)).await;
        cancel.cancel();
        task.await.unwrap();
        assert!(adapter.calls.load(Ordering::SeqCst) >= 1);
    }
}
