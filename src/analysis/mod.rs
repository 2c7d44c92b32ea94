//! Statistical Analyzer
//!
//! Pure, stateless functions over ordered `{timestamp, value}` series:
//!
//! - `trends`: recent-vs-previous window delta and volatility
//! - `seasonality`: weekday means
//! - `correlation`: Pearson r between metal series (statrs Student-t p-values)
//! - `anomaly`: z-score detection
//! - `projector` / `ensemble`: deterministic trend + seasonal + noise forecasts
//!
//! Degenerate input (empty, constant, too short) yields `None`, an empty
//! vector or a neutral value. Nothing here panics or returns an error.

pub mod anomaly;
pub mod correlation;
pub mod ensemble;
pub mod projector;
pub mod seasonality;
pub mod stats;
pub mod trends;

pub use anomaly::detect_anomalies;
pub use correlation::{CorrelationEngine, MetalCorrelation};
pub use ensemble::create_ensemble_forecast;
pub use projector::{get_all_forecasts, Projector, SeasonalTable};
pub use seasonality::{weekly_seasonality, WeeklyProfile, WEEKDAY_NAMES};
pub use trends::{analyze_trend, volatility};
