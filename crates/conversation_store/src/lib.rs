mod error;
mod exchange;
mod history;
mod replay;

pub use error::ConversationStoreError;
pub use exchange::{Exchange, ExchangeKind};
pub use history::{
    ConversationHistory, ConversationLimits, CHARS_PER_TOKEN, DEFAULT_HISTORY_LIMIT,
    DEFAULT_TOKEN_BUDGET,
};
pub use replay::{
    replay_exchange, ACK_RESULT, EXECUTED_RESULT, HISTORY_EXPLANATION, NOT_EXECUTED_RESULT,
};
