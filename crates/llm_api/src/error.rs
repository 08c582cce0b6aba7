use std::fmt;
use std::io;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum EngineError {
    /// The caller's token fired before the response completed.
    Cancelled,
    Timeout,
    Request(reqwest::Error),
    Status {
        status: StatusCode,
        message: String,
    },
    Decode(JsonError),
    Runtime(io::Error),
    WakeChannel(io::Error),
    InvalidHeader(String),
    MissingCredential,
}

impl EngineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayloadFields {
    message: Option<String>,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "request was cancelled"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status { status, message } => write!(f, "HTTP {} {message}", status.as_u16()),
            Self::Decode(error) => write!(f, "invalid JSON response: {error}"),
            Self::Runtime(error) => write!(f, "could not start request runtime: {error}"),
            Self::WakeChannel(error) => write!(f, "cancellation channel failed: {error}"),
            Self::InvalidHeader(key) => write!(f, "invalid header value for {key}"),
            Self::MissingCredential => write!(f, "API credential is required"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            Self::Decode(error) => Some(error),
            Self::Runtime(error) | Self::WakeChannel(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(error)
        }
    }
}

impl From<JsonError> for EngineError {
    fn from(error: JsonError) -> Self {
        Self::Decode(error)
    }
}

/// Human-readable message for a non-success response.
///
/// Prefers `error.message` from a JSON body, then the raw body, then the
/// status reason phrase.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.error)
        .and_then(|error| error.message)
        .filter(|message| !message.trim().is_empty());
    if let Some(message) = message {
        return message;
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
