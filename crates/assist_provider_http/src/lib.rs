//! HTTP-backed implementation of the shared `assist_provider` contract.
//!
//! Builds either wire format, sends it through `llm_api`, and collapses the
//! reply to exactly one tool call. A reply with several calls is resubmitted
//! once; if the model still returns several, the first one wins.

use std::sync::Arc;
use std::time::Duration;

use assist_provider::{
    AssistProvider, DispatchError, DispatchRequest, ProviderKind, ProviderProfile, ProviderTurn,
};
use llm_api::{AuthStyle, CancelToken, EngineConfig, EngineError, EngineRequest, HttpEngine};
use serde_json::Value;
use tracing::debug;

pub mod anthropic;
mod normalize;
pub mod responses;

pub use normalize::{
    WireTurn, EMPTY_RESPONSE_TEXT, NOT_EXECUTED_RESULT, SINGLE_CALL_INSTRUCTION,
    SYNTHETIC_CALL_PREFIX,
};

use normalize::Normalized;

pub const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Runtime configuration for [`HttpProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpProviderConfig {
    pub kind: ProviderKind,
    pub model_id: String,
    pub credential: String,
    pub web_search: bool,
    /// Overrides the provider's public endpoint.
    pub endpoint: Option<String>,
    pub timeout: Option<Duration>,
}

impl HttpProviderConfig {
    #[must_use]
    pub fn new(kind: ProviderKind, credential: impl Into<String>) -> Self {
        Self {
            kind,
            model_id: kind.default_model().to_string(),
            credential: credential.into(),
            web_search: false,
            endpoint: None,
            timeout: None,
        }
    }

    /// Blank values keep the provider's default model.
    #[must_use]
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        if !model_id.trim().is_empty() {
            self.model_id = model_id.trim().to_string();
        }
        self
    }

    #[must_use]
    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn endpoint(&self) -> String {
        self.endpoint.clone().unwrap_or_else(|| {
            match self.kind {
                ProviderKind::Anthropic => anthropic::MESSAGES_ENDPOINT,
                ProviderKind::OpenAi => responses::RESPONSES_ENDPOINT,
            }
            .to_string()
        })
    }

    fn into_engine_config(self) -> EngineConfig {
        let mut config = match self.kind {
            ProviderKind::Anthropic => {
                EngineConfig::new(self.credential, AuthStyle::ApiKeyHeader("x-api-key".into()))
                    .insert_header("anthropic-version", anthropic::API_VERSION)
            }
            ProviderKind::OpenAi => EngineConfig::new(self.credential, AuthStyle::Bearer),
        };
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }
}

trait Transport: Send + Sync {
    fn post(&self, url: &str, body: Value, cancel: &CancelToken) -> Result<Value, EngineError>;
}

impl Transport for HttpEngine {
    fn post(&self, url: &str, body: Value, cancel: &CancelToken) -> Result<Value, EngineError> {
        self.post_json(&EngineRequest::new(url, body), cancel)
    }
}

/// `AssistProvider` backed by one of the two HTTP wire formats.
pub struct HttpProvider {
    profile: ProviderProfile,
    endpoint: String,
    transport: Arc<dyn Transport>,
}

impl HttpProvider {
    pub fn new(config: HttpProviderConfig) -> Self {
        let profile = ProviderProfile {
            kind: config.kind,
            model_id: config.model_id.clone(),
            web_search: config.web_search,
        };
        let endpoint = config.endpoint();
        Self {
            profile,
            endpoint,
            transport: Arc::new(HttpEngine::new(config.into_engine_config())),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn round_trip(
        &self,
        request: &DispatchRequest,
        cancel: &CancelToken,
    ) -> Result<WireTurn, DispatchError> {
        let ProviderProfile {
            kind,
            model_id,
            web_search,
        } = &self.profile;
        let body = match kind {
            ProviderKind::Anthropic => anthropic::build_body(model_id, *web_search, request),
            ProviderKind::OpenAi => responses::build_body(model_id, *web_search, request),
        };
        debug!(
            provider = %kind,
            messages = request.messages.len(),
            "dispatching request"
        );

        let response = self
            .transport
            .post(&self.endpoint, body, cancel)
            .map_err(map_engine_error)?;
        match kind {
            ProviderKind::Anthropic => anthropic::parse_response(&response),
            ProviderKind::OpenAi => responses::parse_response(&response),
        }
    }

    #[cfg(test)]
    fn with_transport_for_tests(config: HttpProviderConfig, transport: Arc<dyn Transport>) -> Self {
        let mut provider = Self::new(config);
        provider.transport = transport;
        provider
    }
}

impl AssistProvider for HttpProvider {
    fn profile(&self) -> ProviderProfile {
        self.profile.clone()
    }

    fn dispatch(
        &self,
        request: &DispatchRequest,
        cancel: &CancelToken,
    ) -> Result<ProviderTurn, DispatchError> {
        let call = match self.round_trip(request, cancel)?.normalize() {
            Normalized::Single(call) => call,
            Normalized::Multiple(turn) => {
                debug!(calls = turn.calls.len(), "resubmitting for a single tool call");
                let mut retry = request.clone();
                retry.messages.extend(turn.resubmit_messages());
                match self.round_trip(&retry, cancel)?.normalize() {
                    Normalized::Single(call) => call,
                    Normalized::Multiple(turn) => {
                        debug!(calls = turn.calls.len(), "taking first of repeated tool calls");
                        turn.into_first()
                    }
                }
            }
        };
        ProviderTurn::from_call(call)
    }
}

fn map_engine_error(error: EngineError) -> DispatchError {
    match error {
        EngineError::Cancelled => DispatchError::Cancelled,
        EngineError::Decode(error) => {
            DispatchError::Protocol(format!("failed to parse API response: {error}"))
        }
        other => DispatchError::Transport(format!("HTTP error: {other}")),
    }
}
