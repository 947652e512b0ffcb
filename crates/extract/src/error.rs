use thiserror::Error;

/// Failures of the extraction pipeline.
///
/// Collaborator failures (model, embeddings, vector store) arrive as `anyhow`
/// errors and are kept opaque under [`ExtractError::Upstream`].
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The request shape is malformed (lengths, duplicates, blank names).
    #[error("validation error: {0}")]
    Validation(String),

    /// Model output could not be parsed against the schema, even after repair.
    #[error("failed to parse model output: {reason}. Got: {output}")]
    Parse { reason: String, output: String },

    /// The model did not identify a schema field for a question.
    #[error("failed to match a schema field: {0}")]
    Match(String),

    /// A step that must yield a single value yielded several.
    #[error("expected a single output value, got {0}")]
    AmbiguousOutput(usize),

    /// A required chain input key was absent.
    #[error("{0} key not found in chain input")]
    MissingKey(&'static str),

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

pub type ExtractResult<T> = Result<T, ExtractError>;

impl ExtractError {
    pub fn parse(reason: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
            output: output.into(),
        }
    }
}
