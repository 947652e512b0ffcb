use serde::{Deserialize, Serialize};
use serde_json::Value;

use extract::{ExtractError, ExtractResult};

/// One prior turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum ChatTurn {
    #[serde(rename = "human")]
    Human(String),
    #[serde(rename = "ai", alias = "assistant")]
    Assistant(String),
    #[serde(rename = "other")]
    Other(String),
}

impl ChatTurn {
    fn render(&self) -> String {
        match self {
            ChatTurn::Human(content) => format!("Human: {content}"),
            ChatTurn::Assistant(content) => format!("Assistant: {content}"),
            ChatTurn::Other(content) => content.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawHistory {
    Text(String),
    Pairs(Vec<Vec<String>>),
    Turns(Vec<ChatTurn>),
}

/// Parse chat history given as turn objects, `[human, ai]` string pairs, or
/// an already rendered transcript.
pub fn parse_history(value: &Value) -> ExtractResult<Vec<ChatTurn>> {
    let raw: RawHistory = serde_json::from_value(value.clone())
        .map_err(|e| ExtractError::Validation(format!("invalid chat_history: {e}")))?;

    let turns = match raw {
        RawHistory::Text(text) if text.is_empty() => Vec::new(),
        RawHistory::Text(text) => vec![ChatTurn::Other(text)],
        RawHistory::Pairs(pairs) => pairs
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(i, message)| {
                if i % 2 == 0 {
                    ChatTurn::Human(message)
                } else {
                    ChatTurn::Assistant(message)
                }
            })
            .collect(),
        RawHistory::Turns(turns) => turns,
    };

    Ok(turns)
}

pub fn render_history(turns: &[ChatTurn]) -> String {
    turns
        .iter()
        .map(ChatTurn::render)
        .collect::<Vec<_>>()
        .join("\n")
}
