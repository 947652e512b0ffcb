//! Stub collaborators for exercising the pipeline without a model server.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::llm::LanguageModel;

type Responder = Box<dyn Fn(&str) -> Result<Vec<String>> + Send + Sync>;

/// A [`LanguageModel`] that answers from a script and records every prompt.
pub struct ScriptedModel {
    responder: Responder,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    /// Answer with `responses` in order, one generation each.
    pub fn new(responses: Vec<&str>) -> Self {
        let queue: Mutex<VecDeque<String>> =
            Mutex::new(responses.into_iter().map(str::to_string).collect());
        Self::with_responder(move |_| {
            let next = queue.lock().unwrap().pop_front();
            match next {
                Some(text) => Ok(vec![text]),
                None => anyhow::bail!("scripted model ran out of responses"),
            }
        })
    }

    /// Fail every call with `message`.
    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::with_responder(move |_| Err(anyhow::anyhow!(message.clone())))
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<String>> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<Vec<String>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.responder)(prompt)
    }
}
