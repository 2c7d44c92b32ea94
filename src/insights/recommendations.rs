//! Second pass: meta-recommendations derived from the emitted insights.

use super::templates;
use crate::types::{DataInsight, Impact, InsightSeverity, InsightType};

/// Severe insights needed before the emergency protocol is recommended.
const EMERGENCY_MIN_SEVERE: usize = 2;

/// Inspect `insights` and return additional recommendation insights.
///
/// - two or more critical/urgent insights: urgent emergency protocol
/// - any risk insight: preventive health measures
/// - a deteriorating trend: increased monitoring
pub fn generate_actionable_recommendations(insights: &[DataInsight]) -> Vec<DataInsight> {
    let mut out = Vec::new();

    let severe = insights.iter().filter(|i| i.severity.is_severe()).count();
    if severe >= EMERGENCY_MIN_SEVERE {
        out.push(
            DataInsight::new(
                InsightType::Recommendation,
                InsightSeverity::Urgent,
                "Activate emergency response protocol",
                format!(
                    "{severe} critical or urgent conditions are active across the monitoring network."
                ),
                95.0,
                Impact::Critical,
            )
            .actionable(templates::EMERGENCY_ACTIONS),
        );
    }

    if insights.iter().any(|i| i.insight_type == InsightType::Risk) {
        out.push(
            DataInsight::new(
                InsightType::Recommendation,
                InsightSeverity::Warning,
                "Preventive health measures advised",
                "At least one location is in the critical HMPI band; exposure through drinking water and irrigation should be limited.",
                85.0,
                Impact::High,
            )
            .actionable(templates::HEALTH_ACTIONS),
        );
    }

    let deteriorating = insights.iter().any(|i| {
        i.insight_type == InsightType::Trend && i.trend_change().is_some_and(|c| c > 0.0)
    });
    if deteriorating {
        out.push(
            DataInsight::new(
                InsightType::Recommendation,
                InsightSeverity::Info,
                "Increase monitoring frequency",
                "Network HMPI is trending upward; denser sampling will confirm the trend and locate its source.",
                80.0,
                Impact::Medium,
            )
            .actionable(templates::MONITORING_ACTIONS),
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn insight(t: InsightType, s: InsightSeverity) -> DataInsight {
        DataInsight::new(t, s, "t", "d", 50.0, Impact::Low)
    }

    #[test]
    fn test_no_triggers() {
        let insights = vec![insight(InsightType::Anomaly, InsightSeverity::Warning)];
        assert!(generate_actionable_recommendations(&insights).is_empty());
        assert!(generate_actionable_recommendations(&[]).is_empty());
    }

    #[test]
    fn test_emergency_needs_two_severe() {
        let one = vec![insight(InsightType::Anomaly, InsightSeverity::Critical)];
        assert!(generate_actionable_recommendations(&one).is_empty());

        let two = vec![
            insight(InsightType::Anomaly, InsightSeverity::Critical),
            insight(InsightType::Anomaly, InsightSeverity::Urgent),
        ];
        let recs = generate_actionable_recommendations(&two);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].severity, InsightSeverity::Urgent);
        assert!(recs[0].actionable);
    }

    #[test]
    fn test_risk_and_deteriorating_trend() {
        let insights = vec![
            insight(InsightType::Risk, InsightSeverity::Warning),
            insight(InsightType::Trend, InsightSeverity::Info)
                .with_data(json!({ "trend_change": 12.0 })),
        ];
        let recs = generate_actionable_recommendations(&insights);
        let titles: Vec<_> = recs.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Preventive health measures advised", "Increase monitoring frequency"]
        );
    }

    #[test]
    fn test_improving_trend_needs_no_monitoring() {
        let insights = vec![insight(InsightType::Trend, InsightSeverity::Info)
            .with_data(json!({ "trend_change": -12.0 }))];
        assert!(generate_actionable_recommendations(&insights).is_empty());
    }
}
