pub mod chain;
pub mod history;

pub use chain::{ChainInput, ChainResult, ChainStage, RetrievalChain};
pub use history::{parse_history, render_history, ChatTurn};
