use std::sync::Arc;

use assist_provider::{AssistProvider, DispatchRequest, ProviderTurn, RunMessage, ToolResponse};
use conversation_store::{ConversationHistory, Exchange};
use llm_api::{CancelToken, SigintGuard};
use tracing::{debug, warn};

use crate::continuation::Continuation;
use crate::error::AssistError;
use crate::host::{Host, ScrollbackSource};
use crate::prompt::{
    continuation_query, docs_result, scrollback_result, system_prompt, EXPLANATION_RETRY,
};
use crate::provider::ProviderFactory;

pub const QUERY_PREFIX: &str = "yo ";
pub const RESET_COMMAND: &str = "yo reset";
pub const RESET_MESSAGE: &str = "Context reset";
pub const MAX_FOLLOW_UPS: usize = 3;
pub const CONTINUATION_SCROLLBACK_LINES: usize = 200;

/// What the host should do with an accepted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAction {
    /// Not for the assistant; run it as a shell command.
    Execute,
    /// Consumed by the assistant.
    Handled,
}

/// One interactive session's assistant state.
///
/// Owns the conversation history and continuation state. Every exchange
/// reloads configuration through the factory and blocks until the provider
/// answers, fails, or the user interrupts it.
pub struct Session {
    factory: Box<dyn ProviderFactory>,
    scrollback: Box<dyn ScrollbackSource>,
    cancel: Arc<CancelToken>,
    sigint: bool,
    history: ConversationHistory,
    continuation: Continuation,
    instructions: Option<String>,
    documentation: String,
}

impl Session {
    pub fn new(
        factory: Box<dyn ProviderFactory>,
        scrollback: Box<dyn ScrollbackSource>,
    ) -> Result<Self, AssistError> {
        let cancel = CancelToken::new().map_err(AssistError::Interrupt)?;
        Ok(Self {
            factory,
            scrollback,
            cancel: Arc::new(cancel),
            sigint: true,
            history: ConversationHistory::default(),
            continuation: Continuation::Idle,
            instructions: None,
            documentation: String::new(),
        })
    }

    /// Leaves SIGINT alone; cancellation then only comes through
    /// [`Session::cancel_token`].
    #[must_use]
    pub fn without_sigint_handler(mut self) -> Self {
        self.sigint = false;
        self
    }

    /// One-time activation. Later calls are ignored.
    pub fn enable(&mut self, base_prompt: &str, documentation: impl Into<String>) {
        if self.instructions.is_some() {
            return;
        }
        let distro = crate::prompt::detect_distro();
        self.enable_with_distro(base_prompt, documentation, distro.as_deref());
    }

    pub fn enable_with_distro(
        &mut self,
        base_prompt: &str,
        documentation: impl Into<String>,
        distro: Option<&str>,
    ) {
        if self.instructions.is_some() {
            return;
        }
        self.instructions = Some(system_prompt(base_prompt, distro));
        self.documentation = documentation.into();
    }

    pub fn is_enabled(&self) -> bool {
        self.instructions.is_some()
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn continuation(&self) -> &Continuation {
        &self.continuation
    }

    pub fn cancel_token(&self) -> &Arc<CancelToken> {
        &self.cancel
    }

    pub fn scrollback(&self, max_lines: usize) -> String {
        self.scrollback.excerpt(max_lines)
    }

    /// Forgets history, captured output and any continuation. No network call.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.scrollback.clear();
        self.continuation = Continuation::Idle;
    }

    /// Ctrl-C while editing drops any pending continuation.
    pub fn on_interrupt(&mut self) {
        self.continuation = Continuation::Idle;
    }

    /// Handles one accepted input line.
    pub fn accept(&mut self, line: &str, host: &mut dyn Host) -> LineAction {
        if !self.is_enabled() {
            return LineAction::Execute;
        }

        if !line.starts_with(QUERY_PREFIX) {
            if self.continuation.on_line_executed(line) {
                self.history.mark_last_executed();
            }
            return LineAction::Execute;
        }

        self.continuation = Continuation::Idle;
        if line == RESET_COMMAND {
            self.clear_history();
            host.show_message(RESET_MESSAGE);
            host.clear_input();
            return LineAction::Handled;
        }

        host.add_history(line);
        self.run_exchange(line.to_string(), host);
        LineAction::Handled
    }

    /// Fires an armed continuation. Call before reading each new line.
    ///
    /// Returns true when a continuation exchange ran.
    pub fn on_prompt(&mut self, host: &mut dyn Host) -> bool {
        let Continuation::Armed {
            suggested,
            executed,
        } = self.continuation.take()
        else {
            return false;
        };

        let excerpt = self.scrollback.excerpt(CONTINUATION_SCROLLBACK_LINES);
        let query = continuation_query(&suggested, &executed, &excerpt);
        debug!(edited = suggested != executed, "firing continuation");
        self.run_exchange(query, host);
        true
    }

    fn run_exchange(&mut self, query: String, host: &mut dyn Host) {
        host.show_thinking();
        let result = self.complete(&query);
        host.clear_thinking();

        match result {
            Ok(turn) => self.apply(query, turn, host),
            Err(AssistError::Cancelled) => {
                debug!("exchange cancelled");
                host.show_message(&AssistError::Cancelled.to_string());
                host.clear_input();
            }
            Err(error) => {
                debug!(%error, "exchange failed");
                host.show_error(&error.to_string());
                host.clear_input();
            }
        }
    }

    fn apply(&mut self, query: String, turn: ProviderTurn, host: &mut dyn Host) {
        let call_id = turn.call.call_id;
        match turn.response {
            ToolResponse::Command {
                command,
                explanation,
                pending,
            } => {
                if let Some(explanation) = explanation.as_deref() {
                    host.show_message(explanation);
                }
                self.history
                    .append(Exchange::command(query, command.clone(), call_id, pending));
                host.prefill(&command);
                self.continuation = Continuation::Suggested { command, pending };
            }
            ToolResponse::Chat { text } => {
                host.show_message(&text);
                self.history.append(Exchange::chat(query, text, call_id));
                host.clear_input();
            }
            other => {
                // Follow-up kinds never leave `complete`.
                let error = AssistError::UnknownResponseKind(other.tool_name().to_string());
                host.show_error(&error.to_string());
                host.clear_input();
            }
        }
    }

    /// Dispatches `query` through follow-ups and the explanation retry.
    fn complete(&mut self, query: &str) -> Result<ProviderTurn, AssistError> {
        let connection = self.factory.connect()?;
        self.history.set_limits(connection.limits);
        let provider = connection.provider.as_ref();

        self.cancel.reset();
        let _guard = if self.sigint {
            Some(SigintGuard::install(&self.cancel).map_err(AssistError::Interrupt)?)
        } else {
            None
        };

        let mut messages = self.history.replay();
        messages.push(RunMessage::user(query));
        let mut turn = self.dispatch(provider, &messages)?;

        let mut follow_ups = 0;
        while turn.response.is_follow_up() {
            if follow_ups == MAX_FOLLOW_UPS {
                return Err(AssistError::ExceededFollowUpBudget);
            }
            let content = match &turn.response {
                ToolResponse::ScrollbackRequest { lines } => {
                    let lines = usize::try_from(*lines).unwrap_or(usize::MAX);
                    scrollback_result(&self.scrollback.excerpt(lines))
                }
                _ => docs_result(&self.documentation),
            };
            debug!(tool = turn.response.tool_name(), follow_ups, "answering follow-up");
            messages.push(RunMessage::assistant_call(turn.call.clone()));
            messages.push(RunMessage::tool_result(&turn.call.call_id, content));
            turn = self.dispatch(provider, &messages)?;
            follow_ups += 1;
        }

        if matches!(
            turn.response,
            ToolResponse::Command {
                explanation: None,
                ..
            }
        ) {
            turn = self.retry_for_explanation(provider, messages, turn)?;
        }
        Ok(turn)
    }

    /// One extra round trip asking for the missing explanation. Keeps the
    /// original turn unless the retry yields a command with an explanation.
    fn retry_for_explanation(
        &self,
        provider: &dyn AssistProvider,
        mut messages: Vec<RunMessage>,
        original: ProviderTurn,
    ) -> Result<ProviderTurn, AssistError> {
        messages.push(RunMessage::assistant_call(original.call.clone()));
        messages.push(RunMessage::tool_result(
            &original.call.call_id,
            EXPLANATION_RETRY,
        ));

        match self.dispatch(provider, &messages) {
            Ok(
                retry @ ProviderTurn {
                    response:
                        ToolResponse::Command {
                            explanation: Some(_),
                            ..
                        },
                    ..
                },
            ) => Ok(retry),
            Ok(retry) => {
                warn!(
                    kind = retry.response.tool_name(),
                    "explanation retry unusable; keeping original"
                );
                Ok(original)
            }
            Err(AssistError::Cancelled) => Err(AssistError::Cancelled),
            Err(error) => {
                warn!(%error, "explanation retry failed; keeping original");
                Ok(original)
            }
        }
    }

    fn dispatch(
        &self,
        provider: &dyn AssistProvider,
        messages: &[RunMessage],
    ) -> Result<ProviderTurn, AssistError> {
        let request = DispatchRequest {
            instructions: self.instructions.clone().unwrap_or_default(),
            messages: messages.to_vec(),
        };
        debug!(messages = messages.len(), "dispatching");
        let turn = provider.dispatch(&request, &self.cancel)?;
        if self.cancel.is_cancelled() {
            return Err(AssistError::Cancelled);
        }
        Ok(turn)
    }
}
