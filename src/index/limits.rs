//! Regulatory limit table for heavy metals.
//!
//! All limits are in μg/L (drinking-water guideline values). Every value that
//! is compared against this table must already be in μg/L.

use std::collections::{BTreeMap, HashMap};

/// Built-in limits, μg/L.
pub const METAL_LIMITS: &[(&str, f64)] = &[
    ("Lead", 10.0),
    ("Mercury", 1.0),
    ("Cadmium", 3.0),
    ("Arsenic", 10.0),
    ("Chromium", 50.0),
    ("Nickel", 20.0),
    ("Copper", 50.0),
    ("Zinc", 5000.0),
    ("Iron", 300.0),
    ("Manganese", 100.0),
];

/// Metals every provider conversion produces, in a fixed order.
pub const MONITORED_METALS: [&str; 5] = ["Lead", "Mercury", "Cadmium", "Arsenic", "Chromium"];

/// Case-insensitive metal → limit lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct MetalLimits {
    limits: HashMap<String, f64>,
}

impl Default for MetalLimits {
    fn default() -> Self {
        Self {
            limits: METAL_LIMITS
                .iter()
                .map(|(metal, limit)| (metal.to_ascii_lowercase(), *limit))
                .collect(),
        }
    }
}

impl MetalLimits {
    /// Table with no entries; every metal is excluded from HMPI.
    pub fn empty() -> Self {
        Self {
            limits: HashMap::new(),
        }
    }

    /// Built-in table with user overrides applied on top.
    ///
    /// Non-positive or non-finite overrides are ignored here; config
    /// validation rejects them before this point.
    pub fn with_overrides(overrides: &BTreeMap<String, f64>) -> Self {
        let mut table = Self::default();
        for (metal, limit) in overrides {
            table.insert(metal, *limit);
        }
        table
    }

    pub fn insert(&mut self, metal: &str, limit: f64) {
        if limit.is_finite() && limit > 0.0 {
            self.limits.insert(metal.to_ascii_lowercase(), limit);
        }
    }

    pub fn get(&self, metal: &str) -> Option<f64> {
        self.limits.get(&metal.to_ascii_lowercase()).copied()
    }

    pub fn contains(&self, metal: &str) -> bool {
        self.get(metal).is_some()
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}
