use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use assist_provider::{
    AssistProvider, DispatchError, DispatchRequest, ProviderKind, RunMessage, ToolResponse,
};
use assist_provider_http::{HttpProvider, HttpProviderConfig};
use llm_api::CancelToken;
use serde_json::Value;

struct Recorded {
    headers: Vec<(String, String)>,
    body: Value,
}

/// Serves each body in turn with the given status, one per connection.
fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<Recorded>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}/v1/endpoint", listener.local_addr().expect("addr"));
    let recorded = Arc::new(Mutex::new(Vec::new()));

    thread::spawn({
        let recorded = Arc::clone(&recorded);
        move || {
            for (status, body) in responses {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                let mut reader = BufReader::new(stream.try_clone().expect("clone"));
                let mut line = String::new();
                let _ = reader.read_line(&mut line);

                let mut headers = Vec::new();
                let mut length = 0usize;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).is_err() {
                        return;
                    }
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((key, value)) = line.split_once(':') {
                        let (key, value) = (key.trim().to_ascii_lowercase(), value.trim().to_owned());
                        if key == "content-length" {
                            length = value.parse().unwrap_or(0);
                        }
                        headers.push((key, value));
                    }
                }
                let mut request_body = vec![0u8; length];
                let _ = reader.read_exact(&mut request_body);
                recorded.lock().expect("lock").push(Recorded {
                    headers,
                    body: serde_json::from_slice(&request_body).unwrap_or(Value::Null),
                });

                let mut stream = stream;
                let _ = write!(
                    stream,
                    "HTTP/1.1 {status} Scripted\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
            }
        }
    });

    (url, recorded)
}

fn header<'a>(recorded: &'a Recorded, name: &str) -> Option<&'a str> {
    recorded
        .headers
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn request() -> DispatchRequest {
    DispatchRequest {
        instructions: "You are a shell assistant.".to_string(),
        messages: vec![RunMessage::user("show disk usage")],
    }
}

#[test]
fn anthropic_dispatch_over_http_sends_key_header_and_parses_call() {
    let (url, recorded) = serve(vec![(
        200,
        r#"{"content":[{"type":"tool_use","id":"toolu_1","name":"command","input":{"command":"df -h","explanation":"disk usage"}}]}"#,
    )]);
    let provider = HttpProvider::new(
        HttpProviderConfig::new(ProviderKind::Anthropic, "sk-test").with_endpoint(&url),
    );
    let cancel = CancelToken::new().expect("token");

    let turn = provider.dispatch(&request(), &cancel).expect("dispatch");
    assert_eq!(
        turn.response,
        ToolResponse::Command {
            command: "df -h".to_string(),
            explanation: Some("disk usage".to_string()),
            pending: false,
        }
    );

    let recorded = recorded.lock().expect("lock");
    assert_eq!(header(&recorded[0], "x-api-key"), Some("sk-test"));
    assert_eq!(header(&recorded[0], "anthropic-version"), Some("2023-06-01"));
    assert_eq!(recorded[0].body["system"], "You are a shell assistant.");
    assert_eq!(recorded[0].body["model"], "claude-sonnet-4-5-20250929");
}

#[test]
fn openai_dispatch_over_http_uses_bearer_auth() {
    let (url, recorded) = serve(vec![(
        200,
        r#"{"error":null,"output":[{"type":"function_call","call_id":"call_9","name":"chat","arguments":"{\"response\":\"42\"}"}]}"#,
    )]);
    let provider = HttpProvider::new(
        HttpProviderConfig::new(ProviderKind::OpenAi, "sk-open")
            .with_model("gpt-test")
            .with_endpoint(&url),
    );
    let cancel = CancelToken::new().expect("token");

    let turn = provider.dispatch(&request(), &cancel).expect("dispatch");
    assert_eq!(turn.call.call_id, "call_9");

    let recorded = recorded.lock().expect("lock");
    assert_eq!(header(&recorded[0], "authorization"), Some("Bearer sk-open"));
    assert_eq!(recorded[0].body["model"], "gpt-test");
    assert_eq!(recorded[0].body["instructions"], "You are a shell assistant.");
}

#[test]
fn non_success_status_is_a_transport_error() {
    let (url, _recorded) = serve(vec![(
        401,
        r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
    )]);
    let provider = HttpProvider::new(
        HttpProviderConfig::new(ProviderKind::Anthropic, "bad").with_endpoint(&url),
    );
    let cancel = CancelToken::new().expect("token");

    match provider.dispatch(&request(), &cancel) {
        Err(DispatchError::Transport(message)) => {
            assert!(message.contains("401"), "{message}");
            assert!(message.contains("invalid x-api-key"), "{message}");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}
