//! Minimal W3C WebDriver client.
//!
//! Talks to a chromedriver (or any WebDriver-compatible) endpoint over its
//! JSON wire protocol. Only the handful of commands the content extractor
//! needs are implemented: session lifecycle, navigation, script execution
//! and element text retrieval.

use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::PipelineError;

/// W3C element identifier key in element references.
pub(crate) const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

#[derive(Clone)]
pub struct WebDriverClient {
    base_url: String,
    client: Client,
}

#[derive(Deserialize)]
struct ValueEnvelope<T> {
    value: T,
}

#[derive(Deserialize)]
struct NewSessionValue {
    #[serde(rename = "sessionId")]
    session_id: String,
}

impl WebDriverClient {
    /// `base_url` is the driver endpoint, e.g. `http://localhost:9515`.
    /// `timeout` bounds every individual wire command.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build WebDriver HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Opens a new headless Chrome session and returns its id.
    pub async fn new_session(&self) -> Result<String, PipelineError> {
        let url = format!("{}/session", self.base_url);
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": [
                            "--headless=new",
                            "--disable-gpu",
                            "--no-sandbox",
                            "--disable-dev-shm-usage"
                        ]
                    }
                }
            }
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| PipelineError::BrowserLaunch(err.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::BrowserLaunch(format!(
                "driver refused session ({}): {}",
                status, text
            )));
        }

        let payload: ValueEnvelope<NewSessionValue> = res
            .json()
            .await
            .map_err(|err| PipelineError::BrowserLaunch(err.to_string()))?;
        Ok(payload.value.session_id)
    }

    pub async fn navigate(&self, session_id: &str, url: &str) -> Result<(), PipelineError> {
        let endpoint = format!("{}/session/{}/url", self.base_url, session_id);
        let res = self
            .client
            .post(&endpoint)
            .json(&json!({ "url": url }))
            .send()
            .await
            .map_err(|err| PipelineError::UpstreamUnavailable(format!("{}: {}", url, err)))?;
        check_command_status(res).await
    }

    /// Executes a synchronous script and returns its result.
    pub async fn execute(&self, session_id: &str, script: &str) -> Result<Value, PipelineError> {
        let endpoint = format!("{}/session/{}/execute/sync", self.base_url, session_id);
        let res = self
            .client
            .post(&endpoint)
            .json(&json!({ "script": script, "args": [] }))
            .send()
            .await
            .map_err(|err| PipelineError::UpstreamUnavailable(err.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::UpstreamUnavailable(format!(
                "script execution failed ({}): {}",
                status, text
            )));
        }

        let payload: ValueEnvelope<Value> = res
            .json()
            .await
            .map_err(|err| PipelineError::UpstreamUnavailable(err.to_string()))?;
        Ok(payload.value)
    }

    /// Returns the visible text of the page's `<body>` element.
    pub async fn body_text(&self, session_id: &str) -> Result<String, PipelineError> {
        let endpoint = format!("{}/session/{}/element", self.base_url, session_id);
        let res = self
            .client
            .post(&endpoint)
            .json(&json!({ "using": "tag name", "value": "body" }))
            .send()
            .await
            .map_err(|err| PipelineError::UpstreamUnavailable(err.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::UpstreamUnavailable(format!(
                "body element lookup failed ({}): {}",
                status, text
            )));
        }

        let payload: ValueEnvelope<Value> = res
            .json()
            .await
            .map_err(|err| PipelineError::UpstreamUnavailable(err.to_string()))?;
        let element_id = payload
            .value
            .get(ELEMENT_KEY)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                PipelineError::UpstreamUnavailable("element reference missing from response".into())
            })?;

        let endpoint = format!(
            "{}/session/{}/element/{}/text",
            self.base_url, session_id, element_id
        );
        let res = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(|err| PipelineError::UpstreamUnavailable(err.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            return Err(PipelineError::UpstreamUnavailable(format!(
                "element text retrieval failed ({})",
                status
            )));
        }

        let payload: ValueEnvelope<String> = res
            .json()
            .await
            .map_err(|err| PipelineError::UpstreamUnavailable(err.to_string()))?;
        Ok(payload.value)
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), PipelineError> {
        let endpoint = format!("{}/session/{}", self.base_url, session_id);
        let res = self
            .client
            .delete(&endpoint)
            .send()
            .await
            .map_err(|err| PipelineError::UpstreamUnavailable(err.to_string()))?;
        check_command_status(res).await
    }
}

async fn check_command_status(res: reqwest::Response) -> Result<(), PipelineError> {
    if res.status().is_success() {
        return Ok(());
    }
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    Err(PipelineError::UpstreamUnavailable(format!(
        "WebDriver command failed ({}): {}",
        status, text
    )))
}
