//! Monitor Configuration Module
//!
//! Provides the service configuration loaded from TOML, environment and CLI.
//!
//! ## Loading Order
//!
//! 1. `HMPI_CONFIG` environment variable (path to TOML file)
//! 2. `hmpi_monitor.toml` in the current working directory
//! 3. Built-in defaults
//!
//! Environment overrides (`HMPI_SERVER_ADDR`, `HMPI_REFRESH_INTERVAL_MS`,
//! `HMPI_ENABLE_FALLBACK`, `WAQI_API_KEY`, `HMPI_BACKUP_API_URL`) are applied
//! on top, then CLI flags in `main`.
//!
//! ## Usage
//!
//! The binary calls `config::init()` once; library components take the
//! sections they need by value so they stay testable without the global.
//!
//! ```ignore
//! config::init(MonitorConfig::load());
//! let interval = config::get().polling.refresh_interval_ms;
//! ```

mod monitor_config;
pub mod defaults;
pub mod validation;

pub use monitor_config::*;

use std::sync::OnceLock;

static MONITOR_CONFIG: OnceLock<MonitorConfig> = OnceLock::new();

/// Initialize the global configuration. Later calls are ignored.
pub fn init(config: MonitorConfig) {
    if MONITOR_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get the global configuration.
///
/// Panics if `init()` has not been called; that is a startup bug.
pub fn get() -> &'static MonitorConfig {
    MONITOR_CONFIG
        .get()
        .expect("config::get() called before config::init()")
}

pub fn is_initialized() -> bool {
    MONITOR_CONFIG.get().is_some()
}
