use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A slice of a corpus document, ready to be embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub doc_id: String,
    pub chunk_id: String,
    pub text: String,
    pub source: String,
    pub index: usize,
}

impl Chunk {
    pub fn new(doc_id: String, text: String, source: String, index: usize) -> Self {
        let chunk_id = Self::generate_chunk_id(&doc_id, &text, index);

        Self {
            doc_id,
            chunk_id,
            text,
            source,
            index,
        }
    }

    // Stable across runs so re-ingesting a file overwrites its points.
    fn generate_chunk_id(doc_id: &str, text: &str, index: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(doc_id.as_bytes());
        hasher.update(index.to_le_bytes());
        hasher.update(text.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }
}
