use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse env variable: {key} = '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: ModelConfig,
    pub embeddings: ModelConfig,
    pub vector_store: VectorStoreConfig,
    pub concurrency: ConcurrencyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    pub url: String,
    pub collection: String,
    pub namespace: String,
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Upper bound on field pipelines running at once within one request.
    pub max_concurrent_fields: usize,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0:3000".to_string(),
            },
            llm: ModelConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "llama3".to_string(),
            },
            embeddings: ModelConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "nomic-embed-text".to_string(),
            },
            vector_store: VectorStoreConfig {
                url: "http://localhost:6333".to_string(),
                collection: "documents".to_string(),
                namespace: "default".to_string(),
                top_k: index::DEFAULT_TOP_K,
            },
            concurrency: ConcurrencyConfig {
                max_concurrent_fields: 5,
                request_timeout_secs: 120,
            },
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `EXTRACT_*` variables, with `.env` loaded first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        override_with(&lookup, "EXTRACT_BIND_ADDR", &mut config.server.bind_addr)?;
        override_with(&lookup, "EXTRACT_LLM_URL", &mut config.llm.base_url)?;
        override_with(&lookup, "EXTRACT_LLM_MODEL", &mut config.llm.model)?;
        override_with(&lookup, "EXTRACT_EMBEDDING_URL", &mut config.embeddings.base_url)?;
        override_with(&lookup, "EXTRACT_EMBEDDING_MODEL", &mut config.embeddings.model)?;
        override_with(&lookup, "EXTRACT_QDRANT_URL", &mut config.vector_store.url)?;
        override_with(&lookup, "EXTRACT_COLLECTION", &mut config.vector_store.collection)?;
        override_with(&lookup, "EXTRACT_NAMESPACE", &mut config.vector_store.namespace)?;
        override_with(&lookup, "EXTRACT_TOP_K", &mut config.vector_store.top_k)?;
        override_with(
            &lookup,
            "EXTRACT_MAX_CONCURRENT_FIELDS",
            &mut config.concurrency.max_concurrent_fields,
        )?;
        override_with(
            &lookup,
            "EXTRACT_REQUEST_TIMEOUT_SECS",
            &mut config.concurrency.request_timeout_secs,
        )?;

        Ok(config)
    }
}

fn override_with<F, T>(lookup: &F, key: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = lookup(key) {
        *slot = value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_overrides() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.vector_store.top_k, 4);
        assert_eq!(config.server.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_env_overrides() {
        let vars = HashMap::from([
            ("EXTRACT_NAMESPACE", "invoices"),
            ("EXTRACT_TOP_K", "8"),
            ("EXTRACT_LLM_MODEL", "mistral"),
        ]);
        let config = AppConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.vector_store.namespace, "invoices");
        assert_eq!(config.vector_store.top_k, 8);
        assert_eq!(config.llm.model, "mistral");
    }

    #[test]
    fn test_unparseable_value_is_an_error() {
        let err = AppConfig::from_lookup(|k| {
            (k == "EXTRACT_MAX_CONCURRENT_FIELDS").then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("EXTRACT_MAX_CONCURRENT_FIELDS"));
    }
}
