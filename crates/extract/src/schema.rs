use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

use crate::error::{ExtractError, ExtractResult};

const JSON_SCHEMA_DRAFT: &str = "http://json-schema.org/draft-07/schema#";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub description: String,
}

/// The expected output shape of one extraction request.
///
/// Every field is an optional string slot carrying its description. The
/// field list is fixed at construction and names are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSchema {
    fields: Vec<FieldDescriptor>,
}

impl ExtractionSchema {
    /// Build a schema from parallel lists of names and descriptions.
    pub fn from_parallel(names: &[String], descriptions: &[String]) -> ExtractResult<Self> {
        if names.len() != descriptions.len() {
            return Err(ExtractError::Validation(format!(
                "got {} data fields but {} descriptions",
                names.len(),
                descriptions.len()
            )));
        }

        let fields = names
            .iter()
            .zip(descriptions)
            .map(|(name, description)| FieldDescriptor {
                name: name.clone(),
                description: description.clone(),
            })
            .collect();

        Self::new(fields)
    }

    pub fn new(fields: Vec<FieldDescriptor>) -> ExtractResult<Self> {
        if fields.is_empty() {
            return Err(ExtractError::Validation(
                "at least one data field is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(ExtractError::Validation(
                    "data field names must not be blank".to_string(),
                ));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ExtractError::Validation(format!(
                    "duplicate data field: {}",
                    field.name
                )));
            }
        }

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// JSON Schema for the whole object with no required fields.
    pub fn to_json_schema(&self) -> Value {
        self.render(&[])
    }

    /// JSON Schema with a single required field, used to scope an answer.
    pub fn to_json_schema_requiring(&self, field: &str) -> ExtractResult<Value> {
        if !self.contains(field) {
            return Err(ExtractError::Match(format!(
                "field {field} is not part of the schema"
            )));
        }
        Ok(self.render(&[field]))
    }

    fn render(&self, required: &[&str]) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| {
                (
                    f.name.clone(),
                    json!({ "type": "string", "description": f.description }),
                )
            })
            .collect();

        let mut schema = json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": false,
            "$schema": JSON_SCHEMA_DRAFT,
        });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }
}
