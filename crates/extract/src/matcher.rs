use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ExtractError, ExtractResult};
use crate::llm::LanguageModel;
use crate::prompt;
use crate::schema::ExtractionSchema;

#[derive(Deserialize)]
struct FieldNameAnswer {
    field_name: String,
}

/// Asks the model which schema field a free-form question refers to.
pub struct FieldMatcher {
    llm: Arc<dyn LanguageModel>,
    schema_text: String,
    schema: ExtractionSchema,
}

impl FieldMatcher {
    pub fn new(llm: Arc<dyn LanguageModel>, schema: ExtractionSchema) -> Self {
        // No field is required here so the model is not steered to one.
        let schema_text = schema.to_json_schema().to_string();
        Self {
            llm,
            schema_text,
            schema,
        }
    }

    pub async fn match_field(&self, question: &str) -> ExtractResult<String> {
        let prompt = prompt::build_field_matching_prompt(&self.schema_text, question);
        let response = self.llm.complete(&prompt).await?;
        debug!(question, response = %response, "Field matcher response");

        let field = parse_field_name(&response)?;
        if !self.schema.contains(&field) {
            return Err(ExtractError::Match(format!(
                "model picked unknown field {field} for question {question:?}"
            )));
        }
        Ok(field)
    }
}

fn parse_field_name(response: &str) -> ExtractResult<String> {
    let trimmed = response.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let answer: FieldNameAnswer = serde_json::from_str(body)
        .map_err(|e| ExtractError::Match(format!("{e} in response {response:?}")))?;
    Ok(answer.field_name)
}
