use std::io::Write;

use tracing::warn;
use yosh_term::ScrollbackHandle;

use crate::config::DEFAULT_CHAT_COLOR;

pub const COLOR_RESET: &str = "\x1b[0m";
pub const THINKING_TEXT: &str = "Thinking...";
pub const CLEAR_LINE: &str = "\r\x1b[K";

/// Side effects the session asks of the surrounding line editor.
pub trait Host {
    fn show_thinking(&mut self);
    fn clear_thinking(&mut self);
    /// Assistant text: explanations, chat answers, status notes.
    fn show_message(&mut self, text: &str);
    fn show_error(&mut self, message: &str);
    /// Places `command` in the input line for the user to edit or run.
    fn prefill(&mut self, command: &str);
    fn clear_input(&mut self);
    fn add_history(&mut self, line: &str);
}

/// Where follow-up requests and continuations read terminal output from.
pub trait ScrollbackSource {
    fn excerpt(&self, max_lines: usize) -> String;
    fn clear(&self);
}

impl ScrollbackSource for ScrollbackHandle {
    fn excerpt(&self, max_lines: usize) -> String {
        ScrollbackHandle::excerpt(self, max_lines)
    }

    fn clear(&self) {
        ScrollbackHandle::clear(self);
    }
}

/// Writes assistant output as colored lines and keeps the prefilled command
/// and input history for a simple line loop.
pub struct TerminalHost<W: Write> {
    out: W,
    color: String,
    prefill: Option<String>,
    history: Vec<String>,
}

impl<W: Write> TerminalHost<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            color: DEFAULT_CHAT_COLOR.to_string(),
            prefill: None,
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_chat_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Command to offer as the next line's default, if any.
    pub fn take_prefill(&mut self) -> Option<String> {
        self.prefill.take()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(error) = result {
            warn!(%error, "terminal write failed");
        }
    }
}

impl<W: Write> Host for TerminalHost<W> {
    fn show_thinking(&mut self) {
        let text = format!("{}{THINKING_TEXT}{COLOR_RESET}", self.color);
        self.emit(&text);
    }

    fn clear_thinking(&mut self) {
        self.emit(CLEAR_LINE);
    }

    fn show_message(&mut self, text: &str) {
        let text = format!("{}{text}{COLOR_RESET}\n", self.color);
        self.emit(&text);
    }

    fn show_error(&mut self, message: &str) {
        let text = format!("{}Error: {message}{COLOR_RESET}\n", self.color);
        self.emit(&text);
    }

    fn prefill(&mut self, command: &str) {
        self.prefill = Some(command.to_string());
    }

    fn clear_input(&mut self) {
        self.prefill = None;
    }

    fn add_history(&mut self, line: &str) {
        self.history.push(line.to_string());
    }
}
