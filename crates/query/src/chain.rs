use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use extract::{prompt, ExtractError, ExtractResult, ExtractionAnswer, LanguageModel, OutputFixingParser};
use index::{Document, Retriever};

use crate::history::{parse_history, render_history, ChatTurn};

const QUESTION_KEY: &str = "question";
const CHAT_HISTORY_KEY: &str = "chat_history";
const FORMAT_INSTRUCTIONS_KEY: &str = "format_instructions";

/// Separator placed between stuffed documents.
const DOCUMENT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStage {
    Init,
    QuestionRewrite,
    Retrieve,
    Answer,
    Done,
}

#[derive(Debug, Clone, Default)]
pub struct ChainInput {
    pub question: String,
    pub chat_history: Vec<ChatTurn>,
    pub format_instructions: Option<String>,
}

impl ChainInput {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainResult {
    pub answer: ExtractionAnswer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_documents: Option<Vec<Document>>,
}

/// Conversational retrieval-augmented QA with a schema-checked answer.
///
/// Runs `Init -> QuestionRewrite? -> Retrieve -> Answer -> Done`. The rewrite
/// step only runs when there is chat history; retrieval is skipped when the
/// final question is empty; the answer step stuffs every retrieved document
/// into one prompt and hands the completion to the output parser.
pub struct RetrievalChain {
    llm: Arc<dyn LanguageModel>,
    retriever: Arc<dyn Retriever>,
    parser: OutputFixingParser,
    return_source_documents: bool,
}

impl RetrievalChain {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        retriever: Arc<dyn Retriever>,
        parser: OutputFixingParser,
    ) -> Self {
        Self {
            llm,
            retriever,
            parser,
            return_source_documents: false,
        }
    }

    pub fn with_source_documents(mut self, enabled: bool) -> Self {
        self.return_source_documents = enabled;
        self
    }

    /// Run the chain from loosely typed inputs.
    ///
    /// `question` and `chat_history` are required; `format_instructions`
    /// defaults to an empty string.
    pub async fn call_values(&self, values: &Value) -> ExtractResult<ChainResult> {
        let question = values
            .get(QUESTION_KEY)
            .ok_or(ExtractError::MissingKey(QUESTION_KEY))?
            .as_str()
            .ok_or_else(|| ExtractError::Validation("question must be a string".to_string()))?;

        let chat_history = parse_history(
            values
                .get(CHAT_HISTORY_KEY)
                .ok_or(ExtractError::MissingKey(CHAT_HISTORY_KEY))?,
        )?;

        let format_instructions = match values.get(FORMAT_INSTRUCTIONS_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(ExtractError::Validation(
                    "format_instructions must be a string".to_string(),
                ));
            }
        };

        self.invoke(ChainInput {
            question: question.to_string(),
            chat_history,
            format_instructions,
        })
        .await
    }

    pub async fn invoke(&self, input: ChainInput) -> ExtractResult<ChainResult> {
        let mut stage = ChainStage::Init;
        let history = render_history(&input.chat_history);
        let mut question = input.question;

        if !history.is_empty() {
            stage = advance(stage, ChainStage::QuestionRewrite);
            question = self.rewrite_question(&history, &question).await?;
        }

        stage = advance(stage, ChainStage::Retrieve);
        let documents = if question.is_empty() {
            Vec::new()
        } else {
            self.retriever.relevant_documents(&question).await?
        };
        debug!(question = %question, documents = documents.len(), "Documents retrieved");

        stage = advance(stage, ChainStage::Answer);
        let format_instructions = input.format_instructions.unwrap_or_default();
        let context = stuff_documents(&documents);
        let answer_prompt = prompt::build_answer_prompt(&context, &question, &format_instructions);

        let completion = self.llm.complete(&answer_prompt).await?;
        let answer = self
            .parser
            .parse_with_repair(&completion, &format_instructions)
            .await?;

        advance(stage, ChainStage::Done);
        Ok(ChainResult {
            answer,
            source_documents: self.return_source_documents.then_some(documents),
        })
    }

    async fn rewrite_question(&self, history: &str, question: &str) -> ExtractResult<String> {
        let rewrite_prompt = prompt::build_question_rewrite_prompt(history, question);
        let mut generations = self.llm.generate(&rewrite_prompt).await?;

        if generations.len() != 1 {
            return Err(ExtractError::AmbiguousOutput(generations.len()));
        }
        let rewritten = generations.remove(0).trim().to_string();
        debug!(original = question, rewritten = %rewritten, "Question rewritten");
        Ok(rewritten)
    }
}

fn advance(from: ChainStage, to: ChainStage) -> ChainStage {
    debug!(?from, ?to, "Retrieval chain stage");
    to
}

fn stuff_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}
