pub mod chunk;
pub mod reader;
pub mod splitter;

pub use chunk::Chunk;
pub use reader::FileReader;
pub use splitter::{SplitterConfig, TextSplitter};

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

/// Generate a stable document ID from file path
pub fn generate_doc_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Chunk a single file.
pub async fn ingest_file(file_path: &Path, splitter: &TextSplitter) -> Result<Vec<Chunk>> {
    let content = FileReader::read_file(file_path).await?;
    let path_str = file_path.to_string_lossy().to_string();
    let doc_id = generate_doc_id(&path_str);

    Ok(splitter.chunk_text(&doc_id, &content, &path_str))
}

/// Chunk every supported file under a directory.
pub async fn ingest_directory(dir_path: &Path, splitter: &TextSplitter) -> Result<Vec<Chunk>> {
    let files = FileReader::read_directory(dir_path).await?;

    let mut all_chunks = Vec::new();
    for (path, content) in &files {
        let doc_id = generate_doc_id(path);
        all_chunks.extend(splitter.chunk_text(&doc_id, content, path));
    }

    info!(files = files.len(), chunks = all_chunks.len(), "Directory ingested");
    Ok(all_chunks)
}

/// Chunk a file or a directory, whichever `path` is.
pub async fn ingest_path(path: &Path, splitter: &TextSplitter) -> Result<Vec<Chunk>> {
    if path.is_dir() {
        ingest_directory(path, splitter).await
    } else {
        ingest_file(path, splitter).await
    }
}
