//! Vector index client.
//!
//! `VectorIndex` abstracts the vector store behind the two operations the
//! pipelines need: append-only `upsert` and top-k similarity `search`.
//! `PineconeIndex` is the production backend.

mod pinecone;

pub use pinecone::PineconeIndex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::PipelineError;

/// A stored page: one ingested URL, its extracted text and its embedding.
///
/// Documents are immutable once stored; re-ingesting a URL creates a new
/// Document with a fresh id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source_url: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(source_url: &str, content: String, embedding: Vec<f32>) -> Self {
        Self {
            id: fresh_document_id(),
            source_url: source_url.to_string(),
            content,
            embedding,
            created_at: Utc::now(),
        }
    }
}

/// Timestamp-derived plus random, so concurrent ingestions never collide.
pub fn fresh_document_id() -> String {
    format!(
        "doc_{}_{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// One result of a similarity search; transient, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalMatch {
    pub document_id: String,
    pub content: String,
    /// Similarity score, higher is better.
    pub score: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Appends a document to the index. Never mutates or deletes existing
    /// documents.
    async fn upsert(&self, document: Document) -> Result<(), PipelineError>;

    /// Returns up to `k` matches in descending score order. An empty index
    /// yields an empty list, not an error.
    async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievalMatch>, PipelineError>;
}
