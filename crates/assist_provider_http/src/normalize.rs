use assist_provider::tools::CHAT_TOOL;
use assist_provider::{RunMessage, ToolCall, ToolResult};
use serde_json::json;
use uuid::Uuid;

pub const SYNTHETIC_CALL_PREFIX: &str = "synthetic_text_response";
pub const EMPTY_RESPONSE_TEXT: &str = "(empty response)";
pub const NOT_EXECUTED_RESULT: &str = "Not executed: respond with exactly one tool call.";
pub const SINGLE_CALL_INSTRUCTION: &str = "You provided multiple tool calls. Please respond with exactly one tool call - the most appropriate one for the user's request.";

/// Calls and free text pulled out of one wire response, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireTurn {
    pub calls: Vec<ToolCall>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Normalized {
    Single(ToolCall),
    Multiple(WireTurn),
}

impl WireTurn {
    pub(crate) fn normalize(mut self) -> Normalized {
        match self.calls.len() {
            0 => Normalized::Single(synthetic_chat(self.text)),
            1 => match self.calls.pop() {
                Some(call) => Normalized::Single(call),
                None => Normalized::Multiple(self),
            },
            _ => Normalized::Multiple(self),
        }
    }

    /// First call, or a synthesized chat when there is none.
    pub(crate) fn into_first(self) -> ToolCall {
        let WireTurn { calls, text } = self;
        calls
            .into_iter()
            .next()
            .unwrap_or_else(|| synthetic_chat(text))
    }

    /// Messages telling the model its previous turn carried too many calls.
    pub(crate) fn resubmit_messages(&self) -> Vec<RunMessage> {
        vec![
            RunMessage::AssistantTurn {
                text: self.text.clone(),
                calls: self.calls.clone(),
            },
            RunMessage::ToolResults {
                results: self
                    .calls
                    .iter()
                    .map(|call| ToolResult::new(&call.call_id, NOT_EXECUTED_RESULT))
                    .collect(),
            },
            RunMessage::user(SINGLE_CALL_INSTRUCTION),
        ]
    }
}

/// Chat call standing in for a reply that ignored forced tool use.
pub(crate) fn synthetic_chat(text: Option<String>) -> ToolCall {
    let text = text
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| EMPTY_RESPONSE_TEXT.to_string());
    ToolCall {
        call_id: format!("{SYNTHETIC_CALL_PREFIX}_{}", Uuid::new_v4().simple()),
        name: CHAT_TOOL.to_string(),
        input: json!({ "response": text }),
    }
}
