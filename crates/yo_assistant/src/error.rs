use std::io;
use std::path::PathBuf;

use assist_provider::{DispatchError, ProviderKind};
use thiserror::Error;

/// Why the provider configuration could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot determine home directory")]
    NoHomeDirectory,
    #[error("Create ~/.yosh/config.json or ~/.yoshkey with your API key (mode 0600)")]
    MissingCredential,
    #[error("{} must have mode 0600 (current: {mode:04o})", .path.display())]
    Permissions { path: PathBuf, mode: u32 },
    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} is empty", .path.display())]
    EmptyCredential { path: PathBuf },
    #[error("Unknown provider '{0}' (expected anthropic or openai)")]
    UnknownProvider(String),
    #[error("~/.yoshkey only holds an anthropic key; set api_key in ~/.yosh/config.json to use {0}")]
    LegacyKeyProvider(ProviderKind),
}

/// Terminal outcome of one exchange that produced no command or chat.
///
/// Every variant ends the current exchange only; the host shows the message
/// and returns to a fresh prompt.
#[derive(Debug, Error)]
pub enum AssistError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Transport(String),
    #[error("Unexpected response: {0}")]
    Protocol(String),
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Cancelled")]
    Cancelled,
    #[error("Too many scrollback requests")]
    ExceededFollowUpBudget,
    #[error("Unknown response type: {0}")]
    UnknownResponseKind(String),
    #[error("Failed to initialize signal handling: {0}")]
    Interrupt(#[source] io::Error),
}

impl AssistError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<DispatchError> for AssistError {
    fn from(error: DispatchError) -> Self {
        match error {
            DispatchError::Cancelled => Self::Cancelled,
            DispatchError::Transport(message) => Self::Transport(message),
            DispatchError::Protocol(message) => Self::Protocol(message),
            DispatchError::Parse(message) => Self::Parse(message),
            DispatchError::UnknownResponseKind(name) => Self::UnknownResponseKind(name),
        }
    }
}
