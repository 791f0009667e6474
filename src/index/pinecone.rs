//! Pinecone data-plane client.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Document, RetrievalMatch, VectorIndex};
use crate::errors::PipelineError;

#[derive(Clone)]
pub struct PineconeIndex {
    client: Client,
    host: String,
    namespace: Option<String>,
    dimension: usize,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Value>,
}

impl PineconeIndex {
    pub fn new(
        host: &str,
        api_key: &str,
        namespace: Option<String>,
        dimension: usize,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Pinecone API key");
        anyhow::ensure!(dimension >= 1, "index dimension must be at least 1");

        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key.trim()).context("invalid Pinecone API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Pinecone HTTP client")?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            namespace,
            dimension,
        })
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), PipelineError> {
        if vector.len() != self.dimension {
            return Err(PipelineError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, document: Document) -> Result<(), PipelineError> {
        self.check_dimension(&document.embedding)?;

        let mut body = json!({
            "vectors": [{
                "id": document.id,
                "values": document.embedding,
                "metadata": {
                    "source_url": document.source_url,
                    "content": document.content,
                    "created_at": document.created_at.to_rfc3339(),
                },
            }],
        });
        if let Some(namespace) = &self.namespace {
            body["namespace"] = json!(namespace);
        }

        let url = format!("{}/vectors/upsert", self.host);
        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| PipelineError::UpstreamUnavailable(err.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::UpstreamUnavailable(format!(
                "Pinecone upsert failed ({}): {}",
                status, text
            )));
        }
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievalMatch>, PipelineError> {
        self.check_dimension(query_vector)?;

        let mut body = json!({
            "vector": query_vector,
            "topK": k,
            "includeMetadata": true,
        });
        if let Some(namespace) = &self.namespace {
            body["namespace"] = json!(namespace);
        }

        let url = format!("{}/query", self.host);
        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| PipelineError::UpstreamUnavailable(err.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::UpstreamUnavailable(format!(
                "Pinecone query failed ({}): {}",
                status, text
            )));
        }

        let payload: QueryResponse = res
            .json()
            .await
            .map_err(|err| PipelineError::UpstreamUnavailable(err.to_string()))?;

        let matches = payload
            .matches
            .into_iter()
            .map(|m| {
                let content = m
                    .metadata
                    .as_ref()
                    .and_then(|meta| meta.get("content"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                RetrievalMatch {
                    document_id: m.id,
                    content,
                    score: m.score,
                }
            })
            .collect();
        Ok(matches)
    }
}
