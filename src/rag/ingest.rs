//! The ingestion pipeline, the write path.

use std::sync::Arc;

use crate::errors::PipelineError;
use crate::extract::ContentExtractor;
use crate::index::{Document, VectorIndex};
use crate::llm::ModelProvider;

/// One-shot pipeline that turns a URL into a stored document.
///
/// Runs extract → embed → store as a linear sequence. The only index
/// write is the final step, so a failure at any earlier stage leaves the
/// index untouched; errors are surfaced verbatim to the caller.
pub struct IngestionPipeline {
    extractor: Arc<dyn ContentExtractor>,
    model: Arc<dyn ModelProvider>,
    index: Arc<dyn VectorIndex>,
}

impl IngestionPipeline {
    pub fn new(
        extractor: Arc<dyn ContentExtractor>,
        model: Arc<dyn ModelProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            extractor,
            model,
            index,
        }
    }

    /// Ingests a single URL and returns the id of the stored document.
    pub async fn run(&self, url: &str) -> Result<String, PipelineError> {
        tracing::debug!(%url, stage = "extracting", "ingestion started");
        let content = self.extractor.extract(url).await?;

        tracing::debug!(%url, stage = "embedding", chars = content.len());
        let embedding = self.model.embed(&content).await?;

        tracing::debug!(%url, stage = "storing", dimension = embedding.len());
        let document = Document::new(url, content, embedding);
        let document_id = document.id.clone();
        self.index.upsert(document).await?;

        tracing::info!(%url, %document_id, "ingestion complete");
        Ok(document_id)
    }
}
