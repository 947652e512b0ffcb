use std::sync::Arc;

use extract::{LanguageModel, OllamaClient};
use index::{EmbeddingClient, QdrantStore, Retriever, VectorStoreRetriever};
use ingest::{SplitterConfig, TextSplitter};

use crate::config::AppConfig;
use crate::metrics::Metrics;

/// Collaborators shared by every request.
pub struct AppState {
    pub llm: Arc<dyn LanguageModel>,
    pub retriever: Arc<dyn Retriever>,
    /// Backing store for ingestion and health checks; absent when the
    /// retriever is not Qdrant-backed.
    pub store: Option<Arc<QdrantStore>>,
    pub splitter: TextSplitter,
    pub config: AppConfig,
    pub metrics: Metrics,
}

impl AppState {
    /// Wire Ollama and Qdrant clients from configuration.
    pub fn from_config(config: AppConfig) -> Self {
        let llm = OllamaClient::new(config.llm.base_url.clone(), config.llm.model.clone());
        let embeddings = EmbeddingClient::new(
            config.embeddings.base_url.clone(),
            config.embeddings.model.clone(),
        );
        let store = Arc::new(QdrantStore::new(
            config.vector_store.url.clone(),
            embeddings,
            config.vector_store.collection.clone(),
            config.vector_store.namespace.clone(),
        ));
        let retriever = VectorStoreRetriever::with_k(store.clone(), config.vector_store.top_k);

        Self {
            llm: Arc::new(llm),
            retriever: Arc::new(retriever),
            store: Some(store),
            splitter: TextSplitter::new(SplitterConfig::default()),
            config,
            metrics: Metrics::new(),
        }
    }

    /// State over arbitrary collaborators, without a vector store for ingestion.
    pub fn with_collaborators(
        llm: Arc<dyn LanguageModel>,
        retriever: Arc<dyn Retriever>,
        config: AppConfig,
    ) -> Self {
        Self {
            llm,
            retriever,
            store: None,
            splitter: TextSplitter::new(SplitterConfig::default()),
            config,
            metrics: Metrics::new(),
        }
    }
}
