use assist_provider::tools::{CHAT_TOOL, COMMAND_TOOL};

/// Final response kinds that are worth remembering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    Command,
    Chat,
}

impl ExchangeKind {
    pub fn tool_name(self) -> &'static str {
        match self {
            Self::Command => COMMAND_TOOL,
            Self::Chat => CHAT_TOOL,
        }
    }
}

/// One completed query/response pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub query: String,
    pub kind: ExchangeKind,
    /// Command text or chat text.
    pub response: String,
    /// Provider id of the tool call that produced the response.
    pub call_id: String,
    pub executed: bool,
    pub pending: bool,
}

impl Exchange {
    pub fn command(
        query: impl Into<String>,
        command: impl Into<String>,
        call_id: impl Into<String>,
        pending: bool,
    ) -> Self {
        Self {
            query: query.into(),
            kind: ExchangeKind::Command,
            response: command.into(),
            call_id: call_id.into(),
            executed: false,
            pending,
        }
    }

    /// Chat exchanges count as executed; there is nothing left to run.
    pub fn chat(
        query: impl Into<String>,
        text: impl Into<String>,
        call_id: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            kind: ExchangeKind::Chat,
            response: text.into(),
            call_id: call_id.into(),
            executed: true,
            pending: false,
        }
    }

    /// Characters counted against the token budget.
    pub fn char_len(&self) -> usize {
        self.query.len() + self.response.len()
    }
}
