//! Deterministic scripted implementation of the shared `assist_provider` contract.
//!
//! Each dispatch pops the next scripted outcome and records the request it was
//! given, so orchestration tests can assert on exactly what would have been
//! sent to a real provider.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use assist_provider::{
    AssistProvider, DispatchError, DispatchRequest, ProviderKind, ProviderProfile, ProviderTurn,
    ToolCall,
};
use llm_api::CancelToken;
use serde_json::Value;

/// One scripted reply.
#[derive(Debug, Clone, PartialEq)]
pub enum MockStep {
    /// Validated through [`ProviderTurn::from_call`] like a real reply.
    Call(ToolCall),
    Fail(DispatchError),
    /// Fires the caller's token, then reports cancellation.
    Cancel,
}

impl MockStep {
    pub fn call(call_id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self::Call(ToolCall {
            call_id: call_id.into(),
            name: name.into(),
            input,
        })
    }
}

/// Scripted provider used by `yo_assistant` tests.
#[derive(Debug)]
pub struct MockProvider {
    profile: ProviderProfile,
    steps: Mutex<VecDeque<MockStep>>,
    requests: Mutex<Vec<DispatchRequest>>,
}

impl MockProvider {
    #[must_use]
    pub fn new(steps: Vec<MockStep>) -> Self {
        Self {
            profile: ProviderProfile {
                kind: ProviderKind::Anthropic,
                model_id: "mock".to_string(),
                web_search: false,
            },
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, step: MockStep) {
        lock_unpoisoned(&self.steps).push_back(step);
    }

    /// Every request dispatched so far, oldest first.
    pub fn requests(&self) -> Vec<DispatchRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    pub fn dispatch_count(&self) -> usize {
        lock_unpoisoned(&self.requests).len()
    }

    pub fn remaining(&self) -> usize {
        lock_unpoisoned(&self.steps).len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl AssistProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        self.profile.clone()
    }

    fn dispatch(
        &self,
        request: &DispatchRequest,
        cancel: &CancelToken,
    ) -> Result<ProviderTurn, DispatchError> {
        lock_unpoisoned(&self.requests).push(request.clone());

        let step = lock_unpoisoned(&self.steps).pop_front();
        match step {
            Some(MockStep::Call(call)) => ProviderTurn::from_call(call),
            Some(MockStep::Fail(error)) => Err(error),
            Some(MockStep::Cancel) => {
                cancel.cancel();
                Err(DispatchError::Cancelled)
            }
            None => Err(DispatchError::Transport(
                "mock provider has no scripted response".to_string(),
            )),
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use assist_provider::{RunMessage, ToolResponse};
    use serde_json::json;

    use super::*;

    fn request(text: &str) -> DispatchRequest {
        DispatchRequest {
            instructions: "sys".to_string(),
            messages: vec![RunMessage::user(text)],
        }
    }

    #[test]
    fn steps_are_consumed_in_order_and_requests_recorded() {
        let provider = MockProvider::new(vec![
            MockStep::call("c1", "chat", json!({"response": "first"})),
            MockStep::Fail(DispatchError::Protocol("bad".to_string())),
        ]);
        let cancel = CancelToken::new().expect("token");

        let turn = provider.dispatch(&request("a"), &cancel).expect("first");
        assert_eq!(
            turn.response,
            ToolResponse::Chat {
                text: "first".to_string()
            }
        );
        assert_eq!(
            provider.dispatch(&request("b"), &cancel),
            Err(DispatchError::Protocol("bad".to_string()))
        );
        assert_eq!(provider.dispatch_count(), 2);
        assert_eq!(provider.requests()[1], request("b"));
        assert_eq!(provider.remaining(), 0);
    }

    #[test]
    fn cancel_step_fires_token() {
        let provider = MockProvider::new(vec![MockStep::Cancel]);
        let cancel = CancelToken::new().expect("token");

        assert_eq!(
            provider.dispatch(&request("x"), &cancel),
            Err(DispatchError::Cancelled)
        );
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn exhausted_script_is_a_transport_error() {
        let provider = MockProvider::default();
        provider.push(MockStep::call("c", "docs", json!({})));
        let cancel = CancelToken::new().expect("token");

        assert!(provider.dispatch(&request("x"), &cancel).is_ok());
        assert!(matches!(
            provider.dispatch(&request("y"), &cancel),
            Err(DispatchError::Transport(_))
        ));
    }

    #[test]
    fn invalid_scripted_call_fails_validation() {
        let provider = MockProvider::new(vec![MockStep::call("c", "command", json!({}))]);
        let cancel = CancelToken::new().expect("token");
        assert!(matches!(
            provider.dispatch(&request("x"), &cancel),
            Err(DispatchError::Parse(_))
        ));
    }
}
