//! Stub retriever for exercising chains without a vector database.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

use crate::document::Document;
use crate::retriever::Retriever;

/// Returns the same documents for every query and records the queries.
pub struct StaticRetriever {
    documents: Vec<Document>,
    failure: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl StaticRetriever {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            failure: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            documents: Vec::new(),
            failure: Some(message.to_string()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn relevant_documents(&self, query: &str) -> Result<Vec<Document>> {
        self.queries.lock().unwrap().push(query.to_string());
        match &self.failure {
            Some(message) => anyhow::bail!("{}", message),
            None => Ok(self.documents.clone()),
        }
    }
}
