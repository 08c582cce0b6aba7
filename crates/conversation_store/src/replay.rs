use assist_provider::{RunMessage, ToolCall};
use serde_json::{json, Map, Value};

use crate::exchange::{Exchange, ExchangeKind};

pub const HISTORY_EXPLANATION: &str = "(from history)";
pub const EXECUTED_RESULT: &str = "User executed the command";
pub const NOT_EXECUTED_RESULT: &str = "User did not execute the command";
pub const ACK_RESULT: &str = "Acknowledged";

/// Re-expresses one exchange as user query, assistant tool call and tool result.
///
/// The replayed command input keeps `pending: true` so multi-step framing
/// stays visible on later turns.
pub fn replay_exchange(exchange: &Exchange) -> [RunMessage; 3] {
    let input = match exchange.kind {
        ExchangeKind::Command => {
            let mut input = Map::new();
            input.insert("command".to_string(), json!(exchange.response));
            input.insert("explanation".to_string(), json!(HISTORY_EXPLANATION));
            if exchange.pending {
                input.insert("pending".to_string(), Value::Bool(true));
            }
            Value::Object(input)
        }
        ExchangeKind::Chat => json!({ "response": exchange.response }),
    };

    let result = match (exchange.kind, exchange.executed) {
        (ExchangeKind::Command, true) => EXECUTED_RESULT,
        (ExchangeKind::Command, false) => NOT_EXECUTED_RESULT,
        (ExchangeKind::Chat, _) => ACK_RESULT,
    };

    [
        RunMessage::user(exchange.query.clone()),
        RunMessage::assistant_call(ToolCall {
            call_id: exchange.call_id.clone(),
            name: exchange.kind.tool_name().to_string(),
            input,
        }),
        RunMessage::tool_result(exchange.call_id.clone(), result),
    ]
}
