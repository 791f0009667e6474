use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProcessUrlRequest {
    pub url: String,
}

/// POST /api/process-url: runs the ingestion pipeline for one URL.
///
/// Ingestion is an explicit user action, so failures surface the specific
/// pipeline error kind and message to the caller.
pub async fn process_url(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProcessUrlRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let url = payload.url.trim();
    let parsed =
        Url::parse(url).map_err(|err| ApiError::BadRequest(format!("invalid url: {}", err)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::BadRequest(format!(
            "unsupported url scheme '{}'",
            parsed.scheme()
        )));
    }

    state.ingestion().run(parsed.as_str()).await?;
    Ok(Json(json!({ "success": true })))
}
