//! Monitor State and Event Bus
//!
//! Shared state for the monitoring pipeline, read by the API handlers and
//! written by the poller. Consumers get a cloneable [`MonitorHandle`] instead
//! of reaching into a global, and can subscribe to [`MonitorEvent`]s.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::defaults::EVENT_CHANNEL_CAPACITY;
use crate::config::MonitorConfig;
use crate::insights::{generate_summary, InsightSynthesizer};
use crate::store::{AlertLog, TimeSeriesStore};
use crate::types::{Alert, DataInsight, InsightsSummary, WaterQualityReading};

// ============================================================================
// Connection Status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No poll has completed yet
    Initializing,
    /// Current batch came from a live source
    Live,
    /// Current batch came from the fallback generator
    Simulated,
    /// Every source failed and fallback is disabled
    Disconnected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Initializing => write!(f, "Initializing"),
            ConnectionStatus::Live => write!(f, "Live"),
            ConnectionStatus::Simulated => write!(f, "Simulated"),
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
        }
    }
}

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    ReadingsUpdated {
        source: String,
        synthetic: bool,
        count: usize,
    },
    AlertRaised(Alert),
    InsightsRefreshed {
        total: usize,
    },
    Disconnected {
        error: String,
    },
}

// ============================================================================
// Monitor State
// ============================================================================

pub struct MonitorState {
    pub store: TimeSeriesStore,
    pub alerts: AlertLog,

    /// Provenance label of the current batch
    pub current_source: Option<String>,
    pub current_synthetic: bool,

    pub insights: Vec<DataInsight>,
    pub summary: InsightsSummary,

    pub status: ConnectionStatus,
    pub last_poll: Option<DateTime<Utc>>,
    pub last_error: Option<String>,

    pub polls_completed: u64,
    pub polls_failed: u64,
    pub polls_skipped: u64,
    pub alerts_raised: u64,

    pub uptime: Instant,
}

impl MonitorState {
    pub fn new(config: &MonitorConfig) -> Self {
        Self::with_store(
            TimeSeriesStore::new(&config.store),
            AlertLog::new(config.store.max_alerts),
        )
    }

    pub fn with_store(store: TimeSeriesStore, alerts: AlertLog) -> Self {
        Self {
            store,
            alerts,
            current_source: None,
            current_synthetic: false,
            insights: Vec::new(),
            summary: InsightsSummary::default(),
            status: ConnectionStatus::Initializing,
            last_poll: None,
            last_error: None,
            polls_completed: 0,
            polls_failed: 0,
            polls_skipped: 0,
            alerts_raised: 0,
            uptime: Instant::now(),
        }
    }

    /// Regenerate insights and the summary from the store. Returns the
    /// insight count.
    pub fn refresh_insights(&mut self, synthesizer: &InsightSynthesizer) -> usize {
        let historical: Vec<WaterQualityReading> = self.store.readings().cloned().collect();
        self.insights = synthesizer.generate_insights(self.store.current(), &historical);
        self.summary = generate_summary(&self.insights);
        self.insights.len()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.uptime.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            status: self.status,
            source: self.current_source.clone(),
            synthetic: self.current_synthetic,
            current_readings: self.store.current().len(),
            buffered_readings: self.store.len(),
            buffer_capacity: self.store.capacity(),
            alerts: self.alerts.len(),
            unacknowledged_alerts: self.alerts.unacknowledged_count(),
            insights: self.insights.len(),
            last_poll: self.last_poll,
            last_error: self.last_error.clone(),
            polls_completed: self.polls_completed,
            polls_failed: self.polls_failed,
            polls_skipped: self.polls_skipped,
            uptime_secs: self.uptime_secs(),
        }
    }
}

/// Serializable view of [`MonitorState`] for the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: ConnectionStatus,
    pub source: Option<String>,
    pub synthetic: bool,
    pub current_readings: usize,
    pub buffered_readings: usize,
    pub buffer_capacity: usize,
    pub alerts: usize,
    pub unacknowledged_alerts: usize,
    pub insights: usize,
    pub last_poll: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub polls_completed: u64,
    pub polls_failed: u64,
    pub polls_skipped: u64,
    pub uptime_secs: u64,
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable access to the monitor state plus its event channel.
#[derive(Clone)]
pub struct MonitorHandle {
    state: Arc<RwLock<MonitorState>>,
    events: broadcast::Sender<MonitorEvent>,
}

impl MonitorHandle {
    pub fn new(state: MonitorState) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(state)),
            events,
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, MonitorState> {
        self.state.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, MonitorState> {
        self.state.write().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    /// Publish to current subscribers. Having none is not an error.
    pub fn publish(&self, event: MonitorEvent) {
        let _ = self.events.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}
