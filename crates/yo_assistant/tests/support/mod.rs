#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use assist_provider::{AssistProvider, RunMessage};
use assist_provider_mock::{MockProvider, MockStep};
use conversation_store::ConversationLimits;
use serde_json::json;
use yo_assistant::{AssistError, Connection, Host, ProviderFactory, ScrollbackSource, Session};

pub const BASE_PROMPT: &str = "You are a test assistant.";
pub const DOCS: &str = "yosh docs: use `yo <question>`.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Thinking,
    ThinkingCleared,
    Message(String),
    Error(String),
    Prefill(String),
    ClearInput,
    History(String),
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    pub events: Vec<HostEvent>,
}

impl RecordingHost {
    pub fn messages(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                HostEvent::Message(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                HostEvent::Error(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn last_prefill(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|event| match event {
            HostEvent::Prefill(command) => Some(command.as_str()),
            _ => None,
        })
    }
}

impl Host for RecordingHost {
    fn show_thinking(&mut self) {
        self.events.push(HostEvent::Thinking);
    }

    fn clear_thinking(&mut self) {
        self.events.push(HostEvent::ThinkingCleared);
    }

    fn show_message(&mut self, text: &str) {
        self.events.push(HostEvent::Message(text.to_string()));
    }

    fn show_error(&mut self, message: &str) {
        self.events.push(HostEvent::Error(message.to_string()));
    }

    fn prefill(&mut self, command: &str) {
        self.events.push(HostEvent::Prefill(command.to_string()));
    }

    fn clear_input(&mut self) {
        self.events.push(HostEvent::ClearInput);
    }

    fn add_history(&mut self, line: &str) {
        self.events.push(HostEvent::History(line.to_string()));
    }
}

#[derive(Debug, Default)]
pub struct ScrollbackTrace {
    pub text: String,
    pub requested: Vec<usize>,
    pub clears: usize,
}

/// Fixed terminal output; records every excerpt size asked for.
#[derive(Clone, Default)]
pub struct FixedScrollback {
    state: Arc<Mutex<ScrollbackTrace>>,
}

impl FixedScrollback {
    pub fn new(text: &str) -> Self {
        let scrollback = Self::default();
        scrollback.set_text(text);
        scrollback
    }

    pub fn set_text(&self, text: &str) {
        lock_unpoisoned(&self.state).text = text.to_string();
    }

    pub fn requested(&self) -> Vec<usize> {
        lock_unpoisoned(&self.state).requested.clone()
    }

    pub fn clears(&self) -> usize {
        lock_unpoisoned(&self.state).clears
    }
}

impl ScrollbackSource for FixedScrollback {
    fn excerpt(&self, max_lines: usize) -> String {
        let mut state = lock_unpoisoned(&self.state);
        state.requested.push(max_lines);
        state.text.clone()
    }

    fn clear(&self) {
        let mut state = lock_unpoisoned(&self.state);
        state.text.clear();
        state.clears += 1;
    }
}

/// Hands out the same scripted provider for every exchange.
pub struct MockFactory {
    provider: Arc<MockProvider>,
    limits: ConversationLimits,
}

impl MockFactory {
    pub fn new(provider: Arc<MockProvider>, limits: ConversationLimits) -> Self {
        Self { provider, limits }
    }
}

impl ProviderFactory for MockFactory {
    fn connect(&self) -> Result<Connection, AssistError> {
        let provider: Arc<dyn AssistProvider> = self.provider.clone();
        Ok(Connection {
            provider,
            limits: self.limits,
        })
    }
}

pub struct Harness {
    pub session: Session,
    pub provider: Arc<MockProvider>,
    pub scrollback: FixedScrollback,
    pub host: RecordingHost,
}

impl Harness {
    pub fn new(steps: Vec<MockStep>) -> Self {
        Self::with_limits(steps, ConversationLimits::default())
    }

    pub fn with_limits(steps: Vec<MockStep>, limits: ConversationLimits) -> Self {
        let provider = Arc::new(MockProvider::new(steps));
        let scrollback = FixedScrollback::default();
        let factory = MockFactory::new(Arc::clone(&provider), limits);
        let mut session = Session::new(Box::new(factory), Box::new(scrollback.clone()))
            .expect("session")
            .without_sigint_handler();
        session.enable_with_distro(BASE_PROMPT, DOCS, None);

        Self {
            session,
            provider,
            scrollback,
            host: RecordingHost::default(),
        }
    }

    pub fn accept(&mut self, line: &str) -> yo_assistant::LineAction {
        self.session.accept(line, &mut self.host)
    }

    pub fn on_prompt(&mut self) -> bool {
        self.session.on_prompt(&mut self.host)
    }

    /// Last user text of the `index`th dispatched request.
    pub fn request_query(&self, index: usize) -> String {
        let requests = self.provider.requests();
        requests[index]
            .messages
            .iter()
            .rev()
            .find_map(|message| match message {
                RunMessage::UserText { text } => Some(text.clone()),
                _ => None,
            })
            .expect("user text in request")
    }
}

pub fn command_step(id: &str, command: &str, explanation: Option<&str>, pending: bool) -> MockStep {
    let mut input = json!({ "command": command, "pending": pending });
    if let Some(explanation) = explanation {
        input["explanation"] = json!(explanation);
    }
    MockStep::call(id, "command", input)
}

pub fn chat_step(id: &str, text: &str) -> MockStep {
    MockStep::call(id, "chat", json!({ "response": text }))
}

pub fn scrollback_step(id: &str, lines: u64) -> MockStep {
    MockStep::call(id, "scrollback", json!({ "lines": lines }))
}

pub fn docs_step(id: &str) -> MockStep {
    MockStep::call(id, "docs", json!({}))
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
