//! Observability: Prometheus metrics

use axum::extract::State;
use axum::response::IntoResponse;

use super::DashboardState;
use crate::pipeline::ConnectionStatus;

/// GET /api/v1/metrics
///
/// Runtime counters in Prometheus text format (version 0.0.4), hand-formatted
/// from fields the poller already maintains.
///
/// Exposed metrics:
/// - `hmpi_polls_total`            cumulative completed polls
/// - `hmpi_poll_failures_total`    polls where every source failed
/// - `hmpi_polls_skipped_total`    ticks dropped because a poll was in flight
/// - `hmpi_alerts_raised_total`    alerts generated since start
/// - `hmpi_alerts_unacknowledged`  alerts awaiting acknowledgement
/// - `hmpi_buffered_readings`      readings held in the history buffer
/// - `hmpi_insights`               insights in the latest synthesis
/// - `hmpi_simulated`              1 when the current batch is synthetic
/// - `hmpi_connected`              0 when disconnected
/// - `hmpi_uptime_seconds`         process uptime
/// - `hmpi_location_index`         latest HMPI per location
pub async fn get_metrics(State(state): State<DashboardState>) -> impl IntoResponse {
    let monitor = state.monitor.read().await;

    let mut body = String::with_capacity(2048);

    body.push_str("# HELP hmpi_polls_total Completed source polls\n");
    body.push_str("# TYPE hmpi_polls_total counter\n");
    body.push_str(&format!("hmpi_polls_total {}\n", monitor.polls_completed));

    body.push_str("# HELP hmpi_poll_failures_total Polls where every source failed\n");
    body.push_str("# TYPE hmpi_poll_failures_total counter\n");
    body.push_str(&format!("hmpi_poll_failures_total {}\n", monitor.polls_failed));

    body.push_str("# HELP hmpi_polls_skipped_total Ticks skipped while a poll was in flight\n");
    body.push_str("# TYPE hmpi_polls_skipped_total counter\n");
    body.push_str(&format!("hmpi_polls_skipped_total {}\n", monitor.polls_skipped));

    body.push_str("# HELP hmpi_alerts_raised_total Alerts generated since start\n");
    body.push_str("# TYPE hmpi_alerts_raised_total counter\n");
    body.push_str(&format!("hmpi_alerts_raised_total {}\n", monitor.alerts_raised));

    body.push_str("# HELP hmpi_alerts_unacknowledged Alerts awaiting acknowledgement\n");
    body.push_str("# TYPE hmpi_alerts_unacknowledged gauge\n");
    body.push_str(&format!(
        "hmpi_alerts_unacknowledged {}\n",
        monitor.alerts.unacknowledged_count()
    ));

    body.push_str("# HELP hmpi_buffered_readings Readings held in the history buffer\n");
    body.push_str("# TYPE hmpi_buffered_readings gauge\n");
    body.push_str(&format!("hmpi_buffered_readings {}\n", monitor.store.len()));

    body.push_str("# HELP hmpi_insights Insights in the latest synthesis\n");
    body.push_str("# TYPE hmpi_insights gauge\n");
    body.push_str(&format!("hmpi_insights {}\n", monitor.insights.len()));

    body.push_str("# HELP hmpi_simulated Whether the current batch is synthetic\n");
    body.push_str("# TYPE hmpi_simulated gauge\n");
    body.push_str(&format!("hmpi_simulated {}\n", u8::from(monitor.current_synthetic)));

    body.push_str("# HELP hmpi_connected Whether any source or the fallback is producing data\n");
    body.push_str("# TYPE hmpi_connected gauge\n");
    body.push_str(&format!(
        "hmpi_connected {}\n",
        u8::from(monitor.status != ConnectionStatus::Disconnected)
    ));

    body.push_str("# HELP hmpi_uptime_seconds Process uptime in seconds\n");
    body.push_str("# TYPE hmpi_uptime_seconds gauge\n");
    body.push_str(&format!("hmpi_uptime_seconds {}\n", monitor.uptime_secs()));

    let current = monitor.store.current();
    if !current.is_empty() {
        body.push_str("# HELP hmpi_location_index Latest heavy metal pollution index per location\n");
        body.push_str("# TYPE hmpi_location_index gauge\n");
        for reading in current {
            body.push_str(&format!(
                "hmpi_location_index{{location=\"{}\"}} {:.2}\n",
                escape_label(&reading.location),
                reading.hmpi
            ));
        }
    }

    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

fn escape_label(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_label() {
        assert_eq!(escape_label(r#"Ganga "Main""#), r#"Ganga \"Main\""#);
        assert_eq!(escape_label("plain"), "plain");
    }
}
