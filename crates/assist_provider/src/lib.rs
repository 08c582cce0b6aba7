//! Provider-neutral contract for one assistant dispatch.
//!
//! A dispatch sends instructions plus a message history and comes back with
//! exactly one validated tool call. Wire formats, transport and retries that
//! collapse several tool calls into one live in the provider implementations.

use std::fmt;
use std::str::FromStr;

use llm_api::CancelToken;
use serde_json::Value;

pub mod response;
pub mod tools;

pub use response::ToolResponse;
pub use tools::tool_catalog;

/// One tool invocation as returned by (or replayed to) a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    pub input: Value,
}

/// Tool offered to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Host answer to one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub call_id: String,
    pub content: String,
}

impl ToolResult {
    #[must_use]
    pub fn new(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
        }
    }
}

/// Provider-neutral history item.
#[derive(Debug, Clone, PartialEq)]
pub enum RunMessage {
    UserText {
        text: String,
    },
    AssistantTurn {
        text: Option<String>,
        calls: Vec<ToolCall>,
    },
    ToolResults {
        results: Vec<ToolResult>,
    },
}

impl RunMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::UserText { text: text.into() }
    }

    pub fn assistant_call(call: ToolCall) -> Self {
        Self::AssistantTurn {
            text: None,
            calls: vec![call],
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResults {
            results: vec![ToolResult::new(call_id, content)],
        }
    }
}

/// Input for one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub instructions: String,
    pub messages: Vec<RunMessage>,
}

/// The single call a dispatch settled on, with its validated meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderTurn {
    pub call: ToolCall,
    pub response: ToolResponse,
}

impl ProviderTurn {
    pub fn from_call(call: ToolCall) -> Result<Self, DispatchError> {
        let response = ToolResponse::from_tool_call(&call)?;
        Ok(Self { call, response })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Anthropic,
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-5-20250929",
            Self::OpenAi => "gpt-5-mini",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable metadata describing a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub kind: ProviderKind,
    pub model_id: String,
    pub web_search: bool,
}

/// Why a dispatch produced no usable turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    Cancelled,
    /// Network, timeout or non-success HTTP status.
    Transport(String),
    /// Response envelope had an unexpected shape.
    Protocol(String),
    /// A known tool call failed field validation.
    Parse(String),
    UnknownResponseKind(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("Cancelled"),
            Self::Transport(message) => write!(f, "{message}"),
            Self::Protocol(message) => write!(f, "Unexpected response: {message}"),
            Self::Parse(message) => write!(f, "Failed to parse response: {message}"),
            Self::UnknownResponseKind(name) => write!(f, "Unknown response type: {name}"),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Provider interface for one blocking dispatch.
pub trait AssistProvider {
    fn profile(&self) -> ProviderProfile;

    /// Sends `request` and returns exactly one validated tool call.
    ///
    /// Must return [`DispatchError::Cancelled`] when `cancel` fires before the
    /// response completes.
    fn dispatch(
        &self,
        request: &DispatchRequest,
        cancel: &CancelToken,
    ) -> Result<ProviderTurn, DispatchError>;
}
