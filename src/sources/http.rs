//! Shared HTTP plumbing for the adapters.
//!
//! Every upstream call goes through [`get_json`] so status handling, body
//! previews and timeout mapping are the same for all providers.

use std::time::Duration;

use tracing::debug;

use super::SourceError;

/// Length of the response body preview kept in errors.
const BODY_PREVIEW_LEN: usize = 200;

/// Build the HTTP client shared by all adapters.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("hmpi-monitor/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(SourceError::Http)
}

/// GET `url` with `query` and parse the body as JSON.
///
/// - non-2xx → [`SourceError::UpstreamStatus`] with a body preview
/// - body not JSON → [`SourceError::Parse`]
/// - request timeout → [`SourceError::Timeout`]
///
/// No retries; the poller's next tick is the retry.
pub async fn get_json(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<serde_json::Value, SourceError> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(map_transport_error)?;

    let status = response.status();
    let text = response.text().await.map_err(map_transport_error)?;

    if !status.is_success() {
        return Err(SourceError::UpstreamStatus {
            status: status.as_u16(),
            body: preview(&text),
        });
    }

    debug!(url, status = status.as_u16(), bytes = text.len(), "Upstream response");

    serde_json::from_str(&text).map_err(|e| {
        SourceError::Parse(format!("{e} (body preview: {})", preview(&text)))
    })
}

fn map_transport_error(e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::Timeout
    } else {
        SourceError::Http(e)
    }
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(BODY_PREVIEW_LEN).collect();
    if text.chars().count() > BODY_PREVIEW_LEN {
        out.push_str("...");
    }
    out
}

/// Join a base URL and a path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://a/", "/b"), "http://a/b");
        assert_eq!(join_url("http://a", "b/c/"), "http://a/b/c/");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "μ".repeat(BODY_PREVIEW_LEN + 10);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), BODY_PREVIEW_LEN + 3);
        assert_eq!(preview("short"), "short");
    }
}
