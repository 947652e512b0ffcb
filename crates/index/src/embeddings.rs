use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::debug;

/// Ollama `/api/embeddings` client. The vector size is probed once and cached.
pub struct EmbeddingClient {
    endpoint: String,
    model: String,
    http: reqwest::Client,
    dimension: OnceCell<usize>,
}

#[derive(Serialize)]
struct EmbedBody<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedReply {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            endpoint: format!("{}/api/embeddings", base_url.trim_end_matches('/')),
            model,
            http: reqwest::Client::new(),
            dimension: OnceCell::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbedBody { model: &self.model, prompt: text };

        let reply = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Embedding request to {} failed", self.endpoint))?
            .error_for_status()
            .context("Embedding endpoint returned an error status")?
            .json::<EmbedReply>()
            .await
            .context("Embedding reply was not valid JSON")?;

        if reply.embedding.is_empty() {
            anyhow::bail!("Embedding model {} returned an empty vector", self.model);
        }
        Ok(reply.embedding)
    }

    /// Vector size of the configured model.
    pub async fn dimension(&self) -> Result<usize> {
        let size = self
            .dimension
            .get_or_try_init(|| async {
                let size = self.embed("dimension probe").await?.len();
                debug!(model = %self.model, size, "Embedding dimension detected");
                Ok::<_, anyhow::Error>(size)
            })
            .await?;
        Ok(*size)
    }
}
