use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::document::Document;
use crate::embeddings::EmbeddingClient;

/// Qdrant collection accessed over its REST API, scoped to one namespace.
///
/// Every point carries a `namespace` payload key; searches filter on it so
/// several corpora can share a collection.
pub struct QdrantStore {
    base_url: String,
    client: reqwest::Client,
    embedding_client: EmbeddingClient,
    collection_name: String,
    namespace: String,
}

#[derive(Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: String,
}

#[derive(Serialize)]
struct UpsertPoints {
    points: Vec<Point>,
}

#[derive(Serialize)]
struct Point {
    id: u64,
    vector: Vec<f32>,
    payload: Map<String, Value>,
}

#[derive(Deserialize)]
struct CollectionInfo {
    result: CollectionResult,
}

#[derive(Deserialize)]
struct CollectionResult {
    collections: Vec<Collection>,
}

#[derive(Deserialize)]
struct Collection {
    name: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Map<String, Value>,
}

impl QdrantStore {
    pub fn new(
        base_url: String,
        embedding_client: EmbeddingClient,
        collection_name: String,
        namespace: String,
    ) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
            embedding_client,
            collection_name,
            namespace,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Initialize collection with proper schema
    pub async fn init_collection(&self) -> Result<()> {
        let url = format!("{}/collections", self.base_url);
        let response = self.client.get(&url).send().await
            .context("Failed to reach Qdrant")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to list collections: {}", response.status());
        }

        let info: CollectionInfo = response.json().await?;
        let exists = info.result.collections.iter()
            .any(|c| c.name == self.collection_name);

        if exists {
            debug!(collection = %self.collection_name, "Collection already exists");
            return Ok(());
        }

        let dimension = self.embedding_client.dimension().await?;

        let url = format!("{}/collections/{}", self.base_url, self.collection_name);
        let create_req = CreateCollection {
            vectors: VectorParams {
                size: dimension,
                distance: "Cosine".to_string(),
            },
        };

        let response = self.client
            .put(&url)
            .json(&create_req)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Failed to create collection: {}", error_text);
        }

        info!(
            collection = %self.collection_name,
            model = self.embedding_client.model(),
            dimension,
            "Collection created"
        );
        Ok(())
    }

    /// Embed and upsert chunks into this store's namespace.
    pub async fn upsert_chunks(&self, chunks: &[ingest::Chunk]) -> Result<usize> {
        let mut points = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let embedding = self.embedding_client
                .embed(&chunk.text)
                .await
                .context(format!("Failed to embed chunk {}", chunk.chunk_id))?;

            points.push(Point {
                id: self.point_id(&chunk.chunk_id),
                vector: embedding,
                payload: self.chunk_payload(chunk),
            });
        }

        if points.is_empty() {
            return Ok(0);
        }

        let count = points.len();
        let url = format!(
            "{}/collections/{}/points?wait=true",
            self.base_url, self.collection_name
        );

        let response = self.client
            .put(&url)
            .json(&UpsertPoints { points })
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Failed to upsert points: {}", error_text);
        }

        info!(namespace = %self.namespace, points = count, "Chunks upserted");
        Ok(count)
    }

    /// Top-`k` documents by descending similarity within the namespace.
    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let query_embedding = self.embedding_client.embed(query).await
            .context("Failed to embed query")?;

        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection_name
        );
        let body = self.search_body(query_embedding, k);

        let response = self.client.post(&url).json(&body).send().await
            .context("Failed to search Qdrant")?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Qdrant search failed: {}", error_text);
        }

        let result: SearchResponse = response.json().await
            .context("Failed to parse Qdrant response")?;

        Ok(result.result.into_iter().map(into_document).collect())
    }

    pub async fn health(&self) -> Result<()> {
        let response = self.client.get(&self.base_url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("status {}", response.status());
        }
        Ok(())
    }

    fn search_body(&self, vector: Vec<f32>, k: usize) -> Value {
        json!({
            "vector": vector,
            "limit": k,
            "with_payload": true,
            "filter": {
                "must": [
                    { "key": "namespace", "match": { "value": self.namespace } }
                ]
            }
        })
    }

    fn chunk_payload(&self, chunk: &ingest::Chunk) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("text".to_string(), json!(chunk.text));
        payload.insert("namespace".to_string(), json!(self.namespace));
        payload.insert("chunk_id".to_string(), json!(chunk.chunk_id));
        payload.insert("doc_id".to_string(), json!(chunk.doc_id));
        payload.insert("source".to_string(), json!(chunk.source));
        payload.insert("index".to_string(), json!(chunk.index));
        payload
    }

    // First 8 bytes of sha256(namespace, chunk_id).
    fn point_id(&self, chunk_id: &str) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.namespace.as_bytes());
        hasher.update([0u8]);
        hasher.update(chunk_id.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(bytes)
    }
}

fn into_document(point: ScoredPoint) -> Document {
    let mut metadata = point.payload;
    let text = match metadata.remove("text") {
        Some(Value::String(text)) => text,
        _ => String::new(),
    };
    metadata.remove("namespace");
    metadata.insert("score".to_string(), json!(point.score));

    Document { text, metadata }
}
