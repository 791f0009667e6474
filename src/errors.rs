use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failures produced by the ingestion and query pipelines.
///
/// Each variant corresponds to one failure mode of an external capability
/// (browser, embedding model, vector index, generation model) or of an
/// invariant those capabilities must uphold.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("page fetch timed out after {timeout_secs}s: {url}")]
    FetchTimeout { url: String, timeout_secs: u64 },
    #[error("page contained no extractable text")]
    EmptyContent,
    #[error("failed to acquire browser session: {0}")]
    BrowserLaunch(String),
    #[error("input of {len} chars exceeds embedding limit of {max}")]
    InputTooLarge { len: usize, max: usize },
    #[error("embedding provider error: {0}")]
    EmbeddingProvider(String),
    #[error("embedding dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("generation provider error: {0}")]
    GenerationProvider(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl PipelineError {
    /// Stable kind name surfaced to ingestion callers and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::FetchTimeout { .. } => "FetchTimeout",
            PipelineError::EmptyContent => "EmptyContent",
            PipelineError::BrowserLaunch(_) => "BrowserLaunchError",
            PipelineError::InputTooLarge { .. } => "InputTooLarge",
            PipelineError::EmbeddingProvider(_) => "EmbeddingProviderError",
            PipelineError::DimensionMismatch { .. } => "DimensionMismatch",
            PipelineError::GenerationProvider(_) => "GenerationProviderError",
            PipelineError::UpstreamUnavailable(_) => "UpstreamUnavailable",
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("{}: {}", .0.kind(), .0)]
    Pipeline(#[from] PipelineError),
    #[error("internal error: {0}")]
    #[allow(dead_code)]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Pipeline(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{}: {}", err.kind(), err),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        // The `stack` field is only populated in debug builds, matching the
        // dev-only stack traces of the original surface.
        let body = if cfg!(debug_assertions) {
            Json(json!({ "error": message, "stack": format!("{:?}", self) }))
        } else {
            Json(json!({ "error": message }))
        };
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        let err = PipelineError::FetchTimeout {
            url: "https://example.com".to_string(),
            timeout_secs: 30,
        };
        assert_eq!(err.kind(), "FetchTimeout");
        assert_eq!(PipelineError::EmptyContent.kind(), "EmptyContent");
        assert_eq!(
            PipelineError::BrowserLaunch("boom".to_string()).kind(),
            "BrowserLaunchError"
        );
        assert_eq!(
            PipelineError::DimensionMismatch {
                expected: 768,
                actual: 3
            }
            .kind(),
            "DimensionMismatch"
        );
    }

    #[test]
    fn pipeline_errors_surface_kind_in_api_message() {
        let api: ApiError = PipelineError::EmptyContent.into();
        assert!(api.to_string().starts_with("EmptyContent"));
    }
}
