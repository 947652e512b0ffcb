use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::document::Document;
use crate::vector_store::QdrantStore;

pub const DEFAULT_TOP_K: usize = 4;

/// Fetches the documents most relevant to a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn relevant_documents(&self, query: &str) -> Result<Vec<Document>>;
}

/// Similarity search over a [`QdrantStore`] with a fixed result count.
#[derive(Clone)]
pub struct VectorStoreRetriever {
    store: Arc<QdrantStore>,
    k: usize,
}

impl VectorStoreRetriever {
    pub fn new(store: Arc<QdrantStore>) -> Self {
        Self::with_k(store, DEFAULT_TOP_K)
    }

    pub fn with_k(store: Arc<QdrantStore>, k: usize) -> Self {
        Self { store, k }
    }
}

#[async_trait]
impl Retriever for VectorStoreRetriever {
    async fn relevant_documents(&self, query: &str) -> Result<Vec<Document>> {
        self.store.similarity_search(query, self.k).await
    }
}
