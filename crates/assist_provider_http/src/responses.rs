//! Responses API wire format: flat typed input items, function tools.
//!
//! A response only counts as successful when its `error` key is present and
//! explicitly `null`; some failures still return an `output` array.

use assist_provider::{tool_catalog, DispatchError, DispatchRequest, RunMessage, ToolCall};
use serde_json::{json, Map, Value};

use crate::normalize::WireTurn;
use crate::MAX_OUTPUT_TOKENS;

pub const RESPONSES_ENDPOINT: &str = "https://api.openai.com/v1/responses";

pub fn build_body(model: &str, web_search: bool, request: &DispatchRequest) -> Value {
    let mut tools: Vec<Value> = tool_catalog()
        .into_iter()
        .map(|tool| {
            json!({
                "type": "function",
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
                "strict": false,
            })
        })
        .collect();
    if web_search {
        tools.push(json!({ "type": "web_search" }));
    }

    let input: Vec<Value> = request.messages.iter().flat_map(to_items).collect();
    json!({
        "model": model,
        "instructions": request.instructions,
        "input": input,
        "max_output_tokens": MAX_OUTPUT_TOKENS,
        "tools": tools,
        "tool_choice": "required",
        "store": false,
    })
}

fn to_items(message: &RunMessage) -> Vec<Value> {
    match message {
        RunMessage::UserText { text } => {
            vec![json!({ "type": "message", "role": "user", "content": text })]
        }
        RunMessage::AssistantTurn { text, calls } => {
            let mut items = Vec::with_capacity(calls.len() + 1);
            if let Some(text) = text.as_deref().filter(|text| !text.is_empty()) {
                items.push(json!({ "type": "message", "role": "assistant", "content": text }));
            }
            items.extend(calls.iter().map(|call| {
                json!({
                    "type": "function_call",
                    "call_id": call.call_id,
                    "name": call.name,
                    "arguments": call.input.to_string(),
                })
            }));
            items
        }
        RunMessage::ToolResults { results } => results
            .iter()
            .map(|result| {
                json!({
                    "type": "function_call_output",
                    "call_id": result.call_id,
                    "output": result.content,
                })
            })
            .collect(),
    }
}

pub fn parse_response(body: &Value) -> Result<WireTurn, DispatchError> {
    match body.get("error") {
        Some(Value::Null) => {}
        Some(error) => {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("API returned an error");
            return Err(DispatchError::Transport(format!("API error: {message}")));
        }
        None => {
            return Err(DispatchError::Protocol(format!(
                "response without explicit null error: {body}"
            )));
        }
    }

    let Some(output) = body.get("output").and_then(Value::as_array) else {
        return Err(DispatchError::Protocol(format!(
            "unexpected API response format: {body}"
        )));
    };

    let mut turn = WireTurn::default();
    for item in output {
        match item.get("type").and_then(Value::as_str) {
            Some("function_call") => turn.calls.push(parse_function_call(item)?),
            Some("message") if turn.text.is_none() => turn.text = output_text(item),
            _ => {}
        }
    }
    Ok(turn)
}

fn parse_function_call(item: &Value) -> Result<ToolCall, DispatchError> {
    let field = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| DispatchError::Protocol(format!("function_call without \"{key}\"")))
    };
    let call_id = field("call_id")?.to_owned();
    let name = field("name")?.to_owned();
    let arguments = item.get("arguments").and_then(Value::as_str).unwrap_or("");
    let input = if arguments.trim().is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(arguments).map_err(|error| {
            DispatchError::Parse(format!("arguments for {name} are not JSON: {error}"))
        })?
    };
    Ok(ToolCall {
        call_id,
        name,
        input,
    })
}

fn output_text(item: &Value) -> Option<String> {
    item.get("content")?
        .as_array()?
        .iter()
        .find(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
        .and_then(|part| part.get("text"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}
