//! Insight types: DataInsight, InsightsSummary and their enums

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Trend,
    Anomaly,
    Risk,
    Recommendation,
    Correlation,
    Forecast,
}

impl std::fmt::Display for InsightType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InsightType::Trend => "trend",
            InsightType::Anomaly => "anomaly",
            InsightType::Risk => "risk",
            InsightType::Recommendation => "recommendation",
            InsightType::Correlation => "correlation",
            InsightType::Forecast => "forecast",
        };
        write!(f, "{s}")
    }
}

/// Insight severity. Declaration order is the ranking order used for sorting
/// (`Urgent` is the most severe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightSeverity {
    Info,
    Warning,
    Critical,
    Urgent,
}

impl InsightSeverity {
    /// Critical or urgent.
    pub fn is_severe(self) -> bool {
        self >= InsightSeverity::Critical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
    Critical,
}

/// A synthesized, human-readable statement derived from the reading history.
///
/// Insights are regenerated wholesale every analysis cycle; two cycles may
/// produce identical insights with different ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInsight {
    pub id: String,
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub severity: InsightSeverity,
    pub title: String,
    pub description: String,
    /// 0-100
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub impact: Impact,
    pub actionable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_points: Option<serde_json::Value>,
    /// Set when the analysed batch came from the fallback generator.
    #[serde(default)]
    pub derived_from_simulated: bool,
}

impl DataInsight {
    pub fn new(
        insight_type: InsightType,
        severity: InsightSeverity,
        title: impl Into<String>,
        description: impl Into<String>,
        confidence: f64,
        impact: Impact,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            insight_type,
            severity,
            title: title.into(),
            description: description.into(),
            confidence: confidence.clamp(0.0, 100.0),
            timestamp: Utc::now(),
            location: None,
            impact,
            actionable: false,
            recommendations: Vec::new(),
            data_points: None,
            derived_from_simulated: false,
        }
    }

    pub fn at_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn actionable(mut self, recommendations: &[&str]) -> Self {
        self.actionable = true;
        self.recommendations = recommendations.iter().map(|r| (*r).to_string()).collect();
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data_points = Some(data);
        self
    }

    /// Trend delta stored by the trend analysis, if any.
    pub fn trend_change(&self) -> Option<f64> {
        self.data_points
            .as_ref()
            .and_then(|d| d.get("trend_change"))
            .and_then(serde_json::Value::as_f64)
    }
}

// ============================================================================
// Summary
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Direction of the HMPI series. Lower HMPI is an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Deteriorating,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Improving => write!(f, "improving"),
            TrendDirection::Stable => write!(f, "stable"),
            TrendDirection::Deteriorating => write!(f, "deteriorating"),
        }
    }
}

/// Aggregate view over one cycle's insights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsSummary {
    pub total: usize,
    pub urgent: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
    pub actionable: usize,
    pub by_type: BTreeMap<InsightType, usize>,
    pub overall_risk: RiskLevel,
    pub trending: TrendDirection,
    pub average_confidence: f64,
    pub based_on_simulated_data: bool,
}

impl Default for InsightsSummary {
    fn default() -> Self {
        Self {
            total: 0,
            urgent: 0,
            critical: 0,
            warning: 0,
            info: 0,
            actionable: 0,
            by_type: BTreeMap::new(),
            overall_risk: RiskLevel::Low,
            trending: TrendDirection::Stable,
            average_confidence: 0.0,
            based_on_simulated_data: false,
        }
    }
}
