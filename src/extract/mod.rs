//! Content extraction from rendered web pages.
//!
//! `WebDriverExtractor` drives a headless browser through a WebDriver
//! endpoint: acquire a session, navigate, wait for the page to settle,
//! read the visible body text, and always release the session, on success
//! and failure paths alike.

mod webdriver;

use std::time::Duration;

use async_trait::async_trait;

use webdriver::WebDriverClient;

use crate::errors::PipelineError;

/// Interval between `document.readyState` polls while waiting for a page
/// to finish loading.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Grace period after the document reports `complete`, giving late
/// scripts a chance to render text.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Reduces a URL to the clean plain text of its rendered page.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Returns non-empty, single-spaced, trimmed text, or fails.
    async fn extract(&self, url: &str) -> Result<String, PipelineError>;
}

pub struct WebDriverExtractor {
    client: WebDriverClient,
    fetch_timeout: Duration,
}

impl WebDriverExtractor {
    pub fn new(webdriver_url: &str, fetch_timeout: Duration) -> anyhow::Result<Self> {
        // Individual wire commands get a slightly longer timeout than the
        // whole-page deadline so the deadline below always fires first and
        // timeouts are reported uniformly as FetchTimeout.
        let client = WebDriverClient::new(webdriver_url, fetch_timeout + Duration::from_secs(5))?;
        Ok(Self {
            client,
            fetch_timeout,
        })
    }

    async fn render_and_read(&self, session_id: &str, url: &str) -> Result<String, PipelineError> {
        self.client.navigate(session_id, url).await?;
        self.wait_until_quiescent(session_id).await?;
        self.client.body_text(session_id).await
    }

    /// Polls `document.readyState` until the page reports `complete`,
    /// then waits a short settle period. The caller bounds this loop with
    /// the fetch deadline.
    async fn wait_until_quiescent(&self, session_id: &str) -> Result<(), PipelineError> {
        loop {
            let state = self
                .client
                .execute(session_id, "return document.readyState")
                .await?;
            if state.as_str() == Some("complete") {
                tokio::time::sleep(SETTLE_DELAY).await;
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl ContentExtractor for WebDriverExtractor {
    async fn extract(&self, url: &str) -> Result<String, PipelineError> {
        let session_id = self.client.new_session().await?;
        tracing::debug!(%url, %session_id, "browser session acquired");

        let result = tokio::time::timeout(self.fetch_timeout, self.render_and_read(&session_id, url))
            .await
            .map_err(|_| PipelineError::FetchTimeout {
                url: url.to_string(),
                timeout_secs: self.fetch_timeout.as_secs(),
            })
            .and_then(|inner| inner);

        // Release the session on every path; a failed release must not
        // mask the extraction result.
        if let Err(err) = self.client.delete_session(&session_id).await {
            tracing::warn!(%session_id, "failed to release browser session: {}", err);
        }

        let text = result?;
        let normalized = normalize_whitespace(&text);
        if normalized.is_empty() {
            return Err(PipelineError::EmptyContent);
        }
        Ok(normalized)
    }
}

/// Collapses every whitespace run to a single space and trims the ends.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::webdriver::ELEMENT_KEY;
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn extractor(server: &MockServer, timeout: Duration) -> WebDriverExtractor {
        WebDriverExtractor::new(&server.base_url(), timeout).unwrap()
    }

    fn mock_session_lifecycle<'a>(
        server: &'a MockServer,
        session_id: &str,
    ) -> (httpmock::Mock<'a>, httpmock::Mock<'a>) {
        let create = server.mock(|when, then| {
            when.method(POST).path("/session");
            then.status(200)
                .json_body(json!({"value": {"sessionId": session_id, "capabilities": {}}}));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path(format!("/session/{}", session_id));
            then.status(200).json_body(json!({"value": null}));
        });
        (create, delete)
    }

    #[test]
    fn whitespace_runs_collapse_to_single_spaces() {
        assert_eq!(
            normalize_whitespace("  Example \t Domain.\n\n This  domain… "),
            "Example Domain. This domain…"
        );
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }

    #[tokio::test]
    async fn extracts_and_normalizes_body_text() {
        let server = MockServer::start_async().await;
        let (_create, delete) = mock_session_lifecycle(&server, "s1");
        server.mock(|when, then| {
            when.method(POST).path("/session/s1/url");
            then.status(200).json_body(json!({"value": null}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/session/s1/execute/sync");
            then.status(200).json_body(json!({"value": "complete"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/session/s1/element");
            then.status(200)
                .json_body(json!({"value": {(ELEMENT_KEY): "el-7"}}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/session/s1/element/el-7/text");
            then.status(200).json_body(
                json!({"value": "  Example   Domain.\n This domain is for use in illustrative examples.  "}),
            );
        });

        let extractor = extractor(&server, Duration::from_secs(5));
        let text = extractor.extract("https://example.com").await.unwrap();
        assert_eq!(
            text,
            "Example Domain. This domain is for use in illustrative examples."
        );
        assert_eq!(delete.hits(), 1);
    }

    #[tokio::test]
    async fn slow_page_times_out_and_releases_session() {
        let server = MockServer::start_async().await;
        let (_create, delete) = mock_session_lifecycle(&server, "s2");
        server.mock(|when, then| {
            when.method(POST).path("/session/s2/url");
            then.status(200).json_body(json!({"value": null}));
        });
        // Page never reaches readyState == complete.
        server.mock(|when, then| {
            when.method(POST).path("/session/s2/execute/sync");
            then.status(200).json_body(json!({"value": "loading"}));
        });

        let extractor = extractor(&server, Duration::from_millis(200));
        let err = extractor.extract("https://example.com").await.unwrap_err();
        assert!(matches!(err, PipelineError::FetchTimeout { .. }));
        assert_eq!(delete.hits(), 1);
    }

    #[tokio::test]
    async fn blank_page_reports_empty_content() {
        let server = MockServer::start_async().await;
        let (_create, delete) = mock_session_lifecycle(&server, "s3");
        server.mock(|when, then| {
            when.method(POST).path("/session/s3/url");
            then.status(200).json_body(json!({"value": null}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/session/s3/execute/sync");
            then.status(200).json_body(json!({"value": "complete"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/session/s3/element");
            then.status(200)
                .json_body(json!({"value": {(ELEMENT_KEY): "el-1"}}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/session/s3/element/el-1/text");
            then.status(200).json_body(json!({"value": " \n\t "}));
        });

        let extractor = extractor(&server, Duration::from_secs(5));
        let err = extractor.extract("https://example.com").await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyContent));
        assert_eq!(delete.hits(), 1);
    }

    #[tokio::test]
    async fn refused_session_reports_browser_launch_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/session");
            then.status(500)
                .json_body(json!({"value": {"error": "session not created"}}));
        });

        let extractor = extractor(&server, Duration::from_secs(5));
        let err = extractor.extract("https://example.com").await.unwrap_err();
        assert!(matches!(err, PipelineError::BrowserLaunch(_)));
    }
}
