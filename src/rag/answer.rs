//! Grounded answer synthesis.

use std::sync::Arc;

use crate::errors::PipelineError;
use crate::llm::ModelProvider;

/// Composes a grounding prompt from retrieved passages and a question,
/// and asks the generation model for an answer.
pub struct AnswerGenerator {
    provider: Arc<dyn ModelProvider>,
}

impl AnswerGenerator {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    /// `passages` must already be in rank order, highest similarity first.
    /// An empty passage list is not an error: the question is still
    /// answered, just without grounding context.
    pub async fn answer(
        &self,
        question: &str,
        passages: &[String],
    ) -> Result<String, PipelineError> {
        let prompt = build_prompt(question, passages);
        self.provider.generate(&prompt).await
    }
}

fn build_prompt(question: &str, passages: &[String]) -> String {
    if passages.is_empty() {
        tracing::debug!("no passages retrieved, answering without grounding context");
        return format!(
            "Answer the following question as helpfully as you can.\n\nQuestion: {}\n\nAnswer:",
            question
        );
    }

    let context = passages.join("\n");
    format!(
        "Answer the question using the context below.\n\nContext: {}\n\nQuestion: {}\n\nAnswer:",
        context, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::testing::StubModel;

    #[tokio::test]
    async fn prompt_carries_passages_in_order_then_question() {
        let model = Arc::new(StubModel::answering("grounded answer"));
        let generator = AnswerGenerator::new(model.clone());

        let passages = vec!["first passage".to_string(), "second passage".to_string()];
        let answer = generator
            .answer("What is example.com for?", &passages)
            .await
            .unwrap();
        assert_eq!(answer, "grounded answer");

        let prompts = model.prompts.lock().unwrap();
        let prompt = &prompts[0];
        let first = prompt.find("first passage").unwrap();
        let second = prompt.find("second passage").unwrap();
        let question = prompt.find("What is example.com for?").unwrap();
        assert!(first < second);
        assert!(second < question);
        assert!(prompt.contains("Context:"));
    }

    #[tokio::test]
    async fn empty_passages_degrade_to_contextless_prompt() {
        let model = Arc::new(StubModel::answering("best effort"));
        let generator = AnswerGenerator::new(model.clone());

        let answer = generator.answer("Anything?", &[]).await.unwrap();
        assert_eq!(answer, "best effort");

        let prompts = model.prompts.lock().unwrap();
        assert!(!prompts[0].contains("Context:"));
        assert!(prompts[0].contains("Anything?"));
    }
}
