pub mod error;
pub mod instructions;
pub mod llm;
pub mod matcher;
pub mod parser;
pub mod prompt;
pub mod schema;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{ExtractError, ExtractResult};
pub use instructions::FormatInstructions;
pub use llm::{LanguageModel, OllamaClient};
pub use matcher::FieldMatcher;
pub use parser::{ExtractionAnswer, OutputFixingParser, OutputParser};
pub use schema::{ExtractionSchema, FieldDescriptor};
