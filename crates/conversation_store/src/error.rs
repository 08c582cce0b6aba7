use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationStoreError {
    #[error("history limit must be at least 1")]
    ZeroHistoryLimit,

    #[error("token budget must be at least 1")]
    ZeroTokenBudget,
}
