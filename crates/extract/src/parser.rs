use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::llm::LanguageModel;
use crate::prompt;
use crate::schema::ExtractionSchema;

/// Validated model answer: schema field -> extracted value, `None` when absent.
pub type ExtractionAnswer = BTreeMap<String, Option<String>>;

fn fenced_block() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("fence pattern is valid")
    })
}

/// Parses raw model text against an [`ExtractionSchema`].
#[derive(Debug, Clone)]
pub struct OutputParser {
    schema: ExtractionSchema,
}

impl OutputParser {
    pub fn new(schema: ExtractionSchema) -> Self {
        Self { schema }
    }

    pub fn parse(&self, text: &str) -> ExtractResult<ExtractionAnswer> {
        let value = match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => value,
            Err(e) => {
                // Fall back to the first fenced block only when the whole text is not JSON.
                let fenced = fenced_block()
                    .captures(text)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str())
                    .ok_or_else(|| ExtractError::parse(format!("invalid JSON: {e}"), text))?;
                serde_json::from_str(fenced)
                    .map_err(|e| ExtractError::parse(format!("invalid JSON: {e}"), text))?
            }
        };

        let Value::Object(object) = value else {
            return Err(ExtractError::parse("expected a JSON object", text));
        };

        let mut answer = ExtractionAnswer::new();
        for (key, value) in object {
            if !self.schema.contains(&key) {
                // Unknown keys are stripped, not rejected.
                continue;
            }
            match value {
                Value::String(s) => {
                    answer.insert(key, Some(s));
                }
                Value::Null => {
                    answer.insert(key, None);
                }
                other => {
                    return Err(ExtractError::parse(
                        format!("field {key} must be a string, got {other}"),
                        text,
                    ));
                }
            }
        }

        Ok(answer)
    }
}

/// An [`OutputParser`] that asks the model to fix unparseable output once.
#[derive(Clone)]
pub struct OutputFixingParser {
    parser: OutputParser,
    llm: Arc<dyn LanguageModel>,
}

impl OutputFixingParser {
    pub fn new(parser: OutputParser, llm: Arc<dyn LanguageModel>) -> Self {
        Self { parser, llm }
    }

    pub async fn parse_with_repair(
        &self,
        text: &str,
        instructions: &str,
    ) -> ExtractResult<ExtractionAnswer> {
        let error = match self.parser.parse(text) {
            Ok(answer) => return Ok(answer),
            Err(e) => e,
        };

        warn!(error = %error, "Model output failed to parse, requesting repair");

        let repair_prompt = prompt::build_repair_prompt(instructions, text, &error.to_string());
        let repaired = self.llm.complete(&repair_prompt).await?;

        debug!(output = %repaired, "Repair output received");
        self.parser.parse(&repaired)
    }
}
