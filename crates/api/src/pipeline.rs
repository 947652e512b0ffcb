use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use extract::{
    ExtractError, ExtractResult, ExtractionSchema, FieldMatcher, FormatInstructions,
    LanguageModel, OutputFixingParser, OutputParser,
};
use index::Retriever;
use query::{ChainInput, ChainResult, RetrievalChain};

/// Field name -> extracted value. Fields without a value are left out.
pub type ExtractionResult = BTreeMap<String, String>;

/// Runs the per-field extraction pipeline for one request.
pub struct FieldExtractor {
    llm: Arc<dyn LanguageModel>,
    retriever: Arc<dyn Retriever>,
    max_concurrent_fields: usize,
}

impl FieldExtractor {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        retriever: Arc<dyn Retriever>,
        max_concurrent_fields: usize,
    ) -> Self {
        Self {
            llm,
            retriever,
            max_concurrent_fields: max_concurrent_fields.max(1),
        }
    }

    /// Extract every field, failing the whole call if any field fails.
    pub async fn extract(
        &self,
        names: &[String],
        descriptions: &[String],
    ) -> ExtractResult<ExtractionResult> {
        let schema = ExtractionSchema::from_parallel(names, descriptions)?;
        let parser = OutputFixingParser::new(OutputParser::new(schema.clone()), self.llm.clone());
        let chain = RetrievalChain::new(self.llm.clone(), self.retriever.clone(), parser)
            .with_source_documents(true);
        let matcher = FieldMatcher::new(self.llm.clone(), schema.clone());

        let names: Vec<String> = schema.names().map(str::to_owned).collect();
        let (schema, chain, matcher) = (&schema, &chain, &matcher);
        let mut outcomes: Vec<(usize, String, ExtractResult<ChainResult>)> =
            stream::iter(names.into_iter().enumerate())
                .map(move |(position, field)| async move {
                    let outcome = extract_field(&field, schema, matcher, chain).await;
                    (position, field, outcome)
                })
                .buffer_unordered(self.max_concurrent_fields)
                .collect()
                .await;

        // Merge in schema order so overlapping answers resolve the same way every time.
        outcomes.sort_by_key(|(position, _, _)| *position);

        let mut result = ExtractionResult::new();
        let mut first_error: Option<ExtractError> = None;
        for (_, field, outcome) in outcomes {
            match outcome {
                Ok(chain_result) => {
                    let sources = chain_result.source_documents.as_ref().map_or(0, Vec::len);
                    debug!(field = %field, sources, "Field extracted");
                    merge_answer(&mut result, chain_result);
                }
                Err(e) => {
                    warn!(field = %field, error = %e, "Field extraction failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(result),
        }
    }
}

async fn extract_field(
    field: &str,
    schema: &ExtractionSchema,
    matcher: &FieldMatcher,
    chain: &RetrievalChain,
) -> ExtractResult<ChainResult> {
    let question = field_question(field);
    let matched = matcher.match_field(&question).await?;
    let instructions = FormatInstructions::for_field(schema, &matched)?;

    chain
        .invoke(ChainInput {
            question,
            chat_history: Vec::new(),
            format_instructions: Some(instructions.into_string()),
        })
        .await
}

fn field_question(field: &str) -> String {
    format!("what is {field},\n").trim().replace('\n', " ")
}

fn merge_answer(result: &mut ExtractionResult, chain_result: ChainResult) {
    for (key, value) in chain_result.answer {
        if let Some(value) = value {
            result.insert(key, value);
        }
    }
}
