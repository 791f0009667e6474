use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::Settings;
use crate::extract::{ContentExtractor, WebDriverExtractor};
use crate::index::{PineconeIndex, VectorIndex};
use crate::llm::{GeminiProvider, ModelProvider};
use crate::rag::{IngestionPipeline, QueryPipeline};

/// Shared application state: configuration plus the three capability
/// clients, constructed once at startup and injected into every pipeline.
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub extractor: Arc<dyn ContentExtractor>,
    pub model: Arc<dyn ModelProvider>,
    pub index: Arc<dyn VectorIndex>,
    pub started_at: DateTime<Utc>,
}

/// Timeout for embedding, generation and vector-store round-trips. Page
/// fetches have their own configurable deadline.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

impl AppState {
    pub fn initialize(settings: Settings) -> anyhow::Result<Arc<Self>> {
        let extractor = WebDriverExtractor::new(&settings.webdriver_url, settings.fetch_timeout)?;
        let model = GeminiProvider::new(
            &settings.gemini_base_url,
            &settings.google_api_key,
            &settings.embed_model,
            &settings.chat_model,
            settings.max_embed_chars,
            PROVIDER_TIMEOUT,
        )?;
        let index = PineconeIndex::new(
            &settings.pinecone_index_host,
            &settings.pinecone_api_key,
            settings.pinecone_namespace.clone(),
            settings.embedding_dimension,
            PROVIDER_TIMEOUT,
        )?;

        Ok(Arc::new(AppState {
            settings,
            extractor: Arc::new(extractor),
            model: Arc::new(model),
            index: Arc::new(index),
            started_at: Utc::now(),
        }))
    }

    /// Fresh write-path pipeline for one request.
    pub fn ingestion(&self) -> IngestionPipeline {
        IngestionPipeline::new(
            self.extractor.clone(),
            self.model.clone(),
            self.index.clone(),
        )
    }

    /// Fresh read-path pipeline for one request.
    pub fn query(&self) -> QueryPipeline {
        QueryPipeline::new(self.model.clone(), self.index.clone(), self.settings.top_k)
    }

    #[cfg(test)]
    pub fn for_tests(
        extractor: Arc<dyn ContentExtractor>,
        model: Arc<dyn ModelProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Arc<Self> {
        let settings = Settings {
            port: 0,
            log_dir: std::path::PathBuf::from("logs"),
            google_api_key: "test".to_string(),
            gemini_base_url: "http://localhost:0".to_string(),
            embed_model: "embedding-001".to_string(),
            chat_model: "gemini-pro".to_string(),
            pinecone_api_key: "test".to_string(),
            pinecone_index_host: "http://localhost:0".to_string(),
            pinecone_namespace: None,
            webdriver_url: "http://localhost:0".to_string(),
            fetch_timeout: std::time::Duration::from_secs(5),
            embedding_dimension: 3,
            top_k: 3,
            max_embed_chars: 32_000,
        };
        Arc::new(AppState {
            settings,
            extractor,
            model,
            index,
            started_at: Utc::now(),
        })
    }
}
