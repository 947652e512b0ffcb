use crate::error::ExtractResult;
use crate::prompt;
use crate::schema::ExtractionSchema;

/// Answer-step instructions scoped to a single schema field.
///
/// The required field is a typed slot in the rendered JSON Schema, not a
/// placeholder patched into finished text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInstructions {
    field: String,
    text: String,
}

impl FormatInstructions {
    pub fn for_field(schema: &ExtractionSchema, field: &str) -> ExtractResult<Self> {
        let scoped = schema.to_json_schema_requiring(field)?;
        let text = prompt::build_format_instructions(&scoped.to_string(), field);

        Ok(Self {
            field: field.to_string(),
            text,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}
