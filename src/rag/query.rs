//! The query pipeline, the read path.

use std::sync::Arc;

use crate::errors::PipelineError;
use crate::index::VectorIndex;
use crate::llm::ModelProvider;
use crate::rag::AnswerGenerator;

/// User-safe reply when any step of the read path fails. The real cause
/// is logged for operators but never shown to the end user.
pub const FALLBACK_ANSWER: &str = "Sorry, I encountered an error. Please try again.";

/// One-shot pipeline that answers a question from the indexed pages.
///
/// Side-effect-free: embeds the question, retrieves the top-k passages
/// and synthesizes a grounded answer. Never mutates the index.
pub struct QueryPipeline {
    model: Arc<dyn ModelProvider>,
    index: Arc<dyn VectorIndex>,
    generator: AnswerGenerator,
    top_k: usize,
}

impl QueryPipeline {
    pub fn new(
        model: Arc<dyn ModelProvider>,
        index: Arc<dyn VectorIndex>,
        top_k: usize,
    ) -> Self {
        let generator = AnswerGenerator::new(model.clone());
        Self {
            model,
            index,
            generator,
            top_k,
        }
    }

    /// Always returns an answer string; failures degrade to
    /// [`FALLBACK_ANSWER`].
    pub async fn run(&self, question: &str) -> String {
        match self.answer(question).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!(kind = err.kind(), "query pipeline failed: {}", err);
                FALLBACK_ANSWER.to_string()
            }
        }
    }

    async fn answer(&self, question: &str) -> Result<String, PipelineError> {
        let query_vector = self.model.embed(question).await?;
        let matches = self.index.search(&query_vector, self.top_k).await?;
        tracing::debug!(matches = matches.len(), top_k = self.top_k, "retrieval done");

        // Passages keep their retrieval rank order.
        let passages: Vec<String> = matches.into_iter().map(|m| m.content).collect();
        self.generator.answer(question, &passages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Document;
    use crate::rag::testing::{InMemoryIndex, StubModel};

    async fn seeded_index() -> Arc<InMemoryIndex> {
        let index = Arc::new(InMemoryIndex::default());
        index
            .upsert(Document::new(
                "https://example.com",
                "Example Domain is for illustrative examples.".to_string(),
                vec![1.0, 0.0, 0.0],
            ))
            .await
            .unwrap();
        index
            .upsert(Document::new(
                "https://other.test",
                "Entirely unrelated page about fish.".to_string(),
                vec![0.0, 1.0, 0.0],
            ))
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn passages_reach_the_generator_in_rank_order() {
        let index = seeded_index().await;
        let model = Arc::new(
            StubModel::answering("It hosts illustrative examples.")
                .with_embedding("What is example.com for?", vec![0.9, 0.1, 0.0]),
        );
        let pipeline = QueryPipeline::new(model.clone(), index, 3);

        let answer = pipeline.run("What is example.com for?").await;
        assert_eq!(answer, "It hosts illustrative examples.");

        let prompts = model.prompts.lock().unwrap();
        let prompt = &prompts[0];
        let best = prompt.find("illustrative examples").unwrap();
        let worst = prompt.find("unrelated page about fish").unwrap();
        assert!(best < worst, "higher-ranked passage must come first");
    }

    #[tokio::test]
    async fn generation_outage_degrades_to_fallback() {
        let index = seeded_index().await;
        let mut model = StubModel::answering("unused");
        model.answer = None;
        let pipeline = QueryPipeline::new(Arc::new(model), index, 3);

        let answer = pipeline.run("What is example.com for?").await;
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn embedding_outage_degrades_to_fallback() {
        let index = seeded_index().await;
        let mut model = StubModel::answering("unused");
        model.embed_fails = true;
        let pipeline = QueryPipeline::new(Arc::new(model), index, 3);

        let answer = pipeline.run("Anything?").await;
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn empty_index_still_answers() {
        let index = Arc::new(InMemoryIndex::default());
        let model = Arc::new(StubModel::answering("best-effort answer"));
        let pipeline = QueryPipeline::new(model.clone(), index, 3);

        let answer = pipeline.run("What now?").await;
        assert_eq!(answer, "best-effort answer");
        // Degraded prompt: no context block when nothing was retrieved.
        assert!(!model.prompts.lock().unwrap()[0].contains("Context:"));
    }

    #[tokio::test]
    async fn querying_never_mutates_the_index() {
        let index = seeded_index().await;
        let before = index.documents().len();
        let pipeline = QueryPipeline::new(
            Arc::new(StubModel::answering("fine")),
            index.clone(),
            3,
        );

        pipeline.run("What is example.com for?").await;
        pipeline.run("What is example.com for?").await;
        assert_eq!(index.documents().len(), before);
    }
}
