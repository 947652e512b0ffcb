pub mod document;
pub mod embeddings;
pub mod retriever;
pub mod vector_store;

pub use document::Document;
pub use embeddings::EmbeddingClient;
pub use retriever::{Retriever, VectorStoreRetriever, DEFAULT_TOP_K};
pub use vector_store::QdrantStore;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
