//! The two RAG pipelines.
//!
//! `IngestionPipeline` is the write path (URL → text → embedding →
//! stored document); `QueryPipeline` is the read path (question →
//! retrieval → grounded answer). Both are one-shot per request and share
//! only the capability clients injected through `AppState`.

mod answer;
mod ingest;
mod query;

pub use answer::AnswerGenerator;
pub use ingest::IngestionPipeline;
pub use query::{QueryPipeline, FALLBACK_ANSWER};
