//! Messages API wire format: role-tagged messages with forced tool use.

use assist_provider::{tool_catalog, DispatchError, DispatchRequest, RunMessage, ToolCall};
use serde_json::{json, Map, Value};

use crate::normalize::WireTurn;
use crate::MAX_OUTPUT_TOKENS;

pub const MESSAGES_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const API_VERSION: &str = "2023-06-01";

pub fn build_body(model: &str, web_search: bool, request: &DispatchRequest) -> Value {
    let mut tools: Vec<Value> = tool_catalog()
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool.input_schema,
            })
        })
        .collect();
    if web_search {
        tools.push(json!({
            "type": "web_search_20250305",
            "name": "web_search",
            "max_uses": 5,
        }));
    }

    json!({
        "model": model,
        "max_tokens": MAX_OUTPUT_TOKENS,
        "system": request.instructions,
        "messages": request.messages.iter().map(to_message).collect::<Vec<_>>(),
        "tools": tools,
        "tool_choice": { "type": "any" },
    })
}

fn to_message(message: &RunMessage) -> Value {
    match message {
        RunMessage::UserText { text } => json!({ "role": "user", "content": text }),
        RunMessage::AssistantTurn { text, calls } => {
            let mut content = Vec::with_capacity(calls.len() + 1);
            if let Some(text) = text.as_deref().filter(|text| !text.is_empty()) {
                content.push(json!({ "type": "text", "text": text }));
            }
            content.extend(calls.iter().map(|call| {
                json!({
                    "type": "tool_use",
                    "id": call.call_id,
                    "name": call.name,
                    "input": call.input,
                })
            }));
            json!({ "role": "assistant", "content": content })
        }
        RunMessage::ToolResults { results } => {
            let content: Vec<Value> = results
                .iter()
                .map(|result| {
                    json!({
                        "type": "tool_result",
                        "tool_use_id": result.call_id,
                        "content": result.content,
                    })
                })
                .collect();
            json!({ "role": "user", "content": content })
        }
    }
}

/// Extracts tool calls and the first text block from a response body.
pub fn parse_response(body: &Value) -> Result<WireTurn, DispatchError> {
    let Some(content) = body.get("content").and_then(Value::as_array) else {
        return Err(envelope_error(body));
    };

    let mut turn = WireTurn::default();
    for block in content {
        match block.get("type").and_then(Value::as_str) {
            Some("tool_use") => turn.calls.push(parse_tool_use(block)?),
            Some("text") if turn.text.is_none() => {
                turn.text = block.get("text").and_then(Value::as_str).map(str::to_owned);
            }
            _ => {}
        }
    }
    Ok(turn)
}

fn parse_tool_use(block: &Value) -> Result<ToolCall, DispatchError> {
    let field = |key: &str| {
        block
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| DispatchError::Protocol(format!("tool_use block without \"{key}\"")))
    };
    Ok(ToolCall {
        call_id: field("id")?,
        name: field("name")?,
        input: block
            .get("input")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
    })
}

fn envelope_error(body: &Value) -> DispatchError {
    match body.get("error") {
        Some(error) => match error.get("message").and_then(Value::as_str) {
            Some(message) => DispatchError::Transport(format!("API error: {message}")),
            None => DispatchError::Transport("API returned an error".to_string()),
        },
        None => DispatchError::Protocol(format!("unexpected API response format: {body}")),
    }
}
