//! Aggregate summary over one cycle's insights.

use crate::types::{DataInsight, InsightSeverity, InsightsSummary, RiskLevel, TrendDirection};

/// Mean trend delta (percent) beyond which the network is considered trending.
const TRENDING_PERCENT: f64 = 2.0;

pub fn generate_summary(insights: &[DataInsight]) -> InsightsSummary {
    let mut summary = InsightsSummary {
        total: insights.len(),
        ..InsightsSummary::default()
    };

    for insight in insights {
        match insight.severity {
            InsightSeverity::Urgent => summary.urgent += 1,
            InsightSeverity::Critical => summary.critical += 1,
            InsightSeverity::Warning => summary.warning += 1,
            InsightSeverity::Info => summary.info += 1,
        }
        if insight.actionable {
            summary.actionable += 1;
        }
        *summary.by_type.entry(insight.insight_type).or_insert(0) += 1;
    }

    summary.overall_risk = if summary.urgent > 0 {
        RiskLevel::Critical
    } else if summary.critical > 0 {
        RiskLevel::High
    } else if summary.warning >= 2 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let deltas: Vec<f64> = insights.iter().filter_map(DataInsight::trend_change).collect();
    if !deltas.is_empty() {
        let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
        summary.trending = if mean > TRENDING_PERCENT {
            TrendDirection::Deteriorating
        } else if mean < -TRENDING_PERCENT {
            TrendDirection::Improving
        } else {
            TrendDirection::Stable
        };
    }

    if !insights.is_empty() {
        summary.average_confidence =
            insights.iter().map(|i| i.confidence).sum::<f64>() / insights.len() as f64;
    }
    summary.based_on_simulated_data = insights.iter().any(|i| i.derived_from_simulated);

    summary
}
