use async_trait::async_trait;

use crate::errors::PipelineError;

/// The two model capabilities both pipelines depend on.
///
/// Implementations are stateless wrappers around network calls and must be
/// safe to share across concurrent requests.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Converts text to a fixed-dimensional embedding vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError>;

    /// Generates a text completion for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String, PipelineError>;
}
