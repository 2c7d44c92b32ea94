//! Unknown-key detection with "did you mean?" suggestions.
//!
//! The raw TOML is walked before serde deserialization and every key that is
//! not a `MonitorConfig` field produces a warning. Warnings never fail a load.

use std::collections::HashSet;

/// A non-fatal config warning.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

/// Sections whose keys are free-form.
const OPEN_SECTIONS: &[&str] = &["limits"];

/// Every valid dotted key path. Keep in sync with `monitor_config.rs`.
pub fn known_config_keys() -> HashSet<&'static str> {
    [
        "server",
        "server.addr",
        "polling",
        "polling.refresh_interval_ms",
        "polling.enable_fallback",
        "polling.request_timeout_secs",
        "sources",
        "sources.waqi_api_key",
        "sources.waqi_base_url",
        "sources.safar_base_url",
        "sources.openaq_base_url",
        "sources.backup_api_url",
        "sources.cities",
        "sources.openaq_country",
        "sources.openaq_limit",
        "store",
        "store.max_readings",
        "store.max_alerts",
        "store.warning_alert_probability",
        "analysis",
        "analysis.anomaly_threshold",
        "analysis.trend_window",
        "analysis.trend_materiality_percent",
        "analysis.volatility_threshold",
        "analysis.correlation_threshold",
        "analysis.forecast_horizon_days",
        "limits",
    ]
    .into_iter()
    .collect()
}

/// Collect all dotted key paths of a TOML tree: `{a = {b = 1}}` → `["a", "a.b"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let Some(table) = value.as_table() else {
        return Vec::new();
    };
    let mut keys = Vec::new();
    for (k, v) in table {
        let path = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        if v.is_table() {
            keys.extend(walk_toml_keys(v, &path));
        }
        keys.push(path);
    }
    keys
}

/// Edit distance over chars.
fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = (above + 1)
                .min(row[j] + 1)
                .min(diag + usize::from(ca != *cb));
            diag = above;
        }
    }
    row[b.len()]
}

/// Closest known key within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (*k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= 3)
        .min_by(|(ka, da), (kb, db)| da.cmp(db).then(ka.cmp(kb)))
        .map(|(k, _)| k.to_string())
}

/// Warnings for unknown keys in a raw TOML string. Parse errors are left to serde.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .filter(|key| {
            !OPEN_SECTIONS
                .iter()
                .any(|section| key.starts_with(&format!("{section}.")))
        })
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}
