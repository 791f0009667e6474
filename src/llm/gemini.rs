//! Gemini REST client for embeddings and text generation.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::ModelProvider;
use crate::errors::PipelineError;

#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    embed_model: String,
    chat_model: String,
    max_embed_chars: usize,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbedValues,
}

#[derive(Deserialize)]
struct EmbedValues {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiProvider {
    pub fn new(
        base_url: &str,
        api_key: &str,
        embed_model: &str,
        chat_model: &str,
        max_embed_chars: usize,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Gemini API key");
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            embed_model: embed_model.to_string(),
            chat_model: chat_model.to_string(),
            max_embed_chars,
        })
    }

    fn endpoint(&self, model: &str, action: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}?key={}",
            self.base_url,
            model,
            action,
            urlencoding::encode(&self.api_key)
        )
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        if text.is_empty() {
            return Err(PipelineError::EmbeddingProvider(
                "refusing to embed empty input".to_string(),
            ));
        }
        let len = text.chars().count();
        if len > self.max_embed_chars {
            // Truncating here would silently corrupt retrieval; the caller
            // has to decide how to shrink the input.
            return Err(PipelineError::InputTooLarge {
                len,
                max: self.max_embed_chars,
            });
        }

        let url = self.endpoint(&self.embed_model, "embedContent");
        let body = json!({
            "model": format!("models/{}", self.embed_model),
            "content": { "parts": [{ "text": text }] },
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(embed_transport_error)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::EmbeddingProvider(format!(
                "Gemini embed error ({}): {}",
                status, text
            )));
        }

        let payload: EmbedResponse = res
            .json()
            .await
            .map_err(|err| PipelineError::EmbeddingProvider(err.to_string()))?;
        if payload.embedding.values.is_empty() {
            return Err(PipelineError::EmbeddingProvider(
                "Gemini returned an empty embedding".to_string(),
            ));
        }
        Ok(payload.embedding.values)
    }

    async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let url = self.endpoint(&self.chat_model, "generateContent");
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(generate_transport_error)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::GenerationProvider(format!(
                "Gemini generate error ({}): {}",
                status, text
            )));
        }

        let payload: GenerateResponse = res
            .json()
            .await
            .map_err(|err| PipelineError::GenerationProvider(err.to_string()))?;

        let answer = payload
            .candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if answer.is_empty() {
            return Err(PipelineError::GenerationProvider(
                "Gemini response contained no candidates".to_string(),
            ));
        }
        Ok(answer)
    }
}

fn embed_transport_error(err: reqwest::Error) -> PipelineError {
    if err.is_timeout() || err.is_connect() {
        PipelineError::UpstreamUnavailable(err.to_string())
    } else {
        PipelineError::EmbeddingProvider(err.to_string())
    }
}

fn generate_transport_error(err: reqwest::Error) -> PipelineError {
    if err.is_timeout() || err.is_connect() {
        PipelineError::UpstreamUnavailable(err.to_string())
    } else {
        PipelineError::GenerationProvider(err.to_string())
    }
}
