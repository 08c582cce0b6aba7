use serde_json::{json, Map, Value};

use crate::tools::{CHAT_TOOL, COMMAND_TOOL, DOCS_TOOL, SCROLLBACK_TOOL};
use crate::{DispatchError, ToolCall};

pub const DEFAULT_SCROLLBACK_LINES: u32 = 50;
pub const MAX_SCROLLBACK_LINES: u32 = 1000;

/// What the model decided to do, after field validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResponse {
    Command {
        command: String,
        /// `None` when absent or empty; triggers the explanation retry.
        explanation: Option<String>,
        pending: bool,
    },
    Chat {
        text: String,
    },
    ScrollbackRequest {
        lines: u32,
    },
    DocsRequest,
}

impl ToolResponse {
    /// Validates a raw tool call.
    ///
    /// A command without `command` or a chat without `response` is a parse
    /// error. Scrollback line counts outside `1..=1000` are clamped, with
    /// missing, non-numeric or non-positive values becoming 50.
    pub fn from_tool_call(call: &ToolCall) -> Result<Self, DispatchError> {
        let input = call.input.as_object();
        let string_field = |key: &str| {
            input
                .and_then(|input| input.get(key))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        match call.name.as_str() {
            COMMAND_TOOL => {
                let command = string_field("command").ok_or_else(|| {
                    DispatchError::Parse("command response is missing \"command\"".to_string())
                })?;
                let explanation = string_field("explanation").filter(|text| !text.is_empty());
                let pending = input
                    .and_then(|input| input.get("pending"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                Ok(Self::Command {
                    command,
                    explanation,
                    pending,
                })
            }
            CHAT_TOOL => {
                let text = string_field("response").ok_or_else(|| {
                    DispatchError::Parse("chat response is missing \"response\"".to_string())
                })?;
                Ok(Self::Chat { text })
            }
            SCROLLBACK_TOOL => {
                let requested = input
                    .and_then(|input| input.get("lines"))
                    .and_then(Value::as_f64)
                    .map(|lines| lines.trunc() as i64);
                Ok(Self::ScrollbackRequest {
                    lines: clamp_lines(requested),
                })
            }
            DOCS_TOOL => Ok(Self::DocsRequest),
            other => Err(DispatchError::UnknownResponseKind(other.to_string())),
        }
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Command { .. } => COMMAND_TOOL,
            Self::Chat { .. } => CHAT_TOOL,
            Self::ScrollbackRequest { .. } => SCROLLBACK_TOOL,
            Self::DocsRequest => DOCS_TOOL,
        }
    }

    /// True for the kinds that ask the host for more context.
    pub fn is_follow_up(&self) -> bool {
        matches!(self, Self::ScrollbackRequest { .. } | Self::DocsRequest)
    }

    /// Tool input that re-expresses this response.
    pub fn to_input(&self) -> Value {
        match self {
            Self::Command {
                command,
                explanation,
                pending,
            } => {
                let mut input = Map::new();
                input.insert("command".to_string(), json!(command));
                if let Some(explanation) = explanation {
                    input.insert("explanation".to_string(), json!(explanation));
                }
                if *pending {
                    input.insert("pending".to_string(), Value::Bool(true));
                }
                Value::Object(input)
            }
            Self::Chat { text } => json!({ "response": text }),
            Self::ScrollbackRequest { lines } => json!({ "lines": lines }),
            Self::DocsRequest => json!({}),
        }
    }
}

fn clamp_lines(requested: Option<i64>) -> u32 {
    match requested {
        Some(lines) if lines > 0 => lines.min(i64::from(MAX_SCROLLBACK_LINES)) as u32,
        _ => DEFAULT_SCROLLBACK_LINES,
    }
}
