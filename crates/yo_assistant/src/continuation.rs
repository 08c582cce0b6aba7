use std::mem;

/// Multi-step follow-up state carried between accepted lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Continuation {
    #[default]
    Idle,
    /// A suggested command sits in the input line, not yet accepted.
    Suggested { command: String, pending: bool },
    /// The user ran a pending suggestion; fires once on the next prompt.
    Armed { suggested: String, executed: String },
}

impl Continuation {
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed { .. })
    }

    pub(crate) fn take(&mut self) -> Self {
        mem::take(self)
    }

    /// Transition for an accepted line that is not a query.
    ///
    /// Returns true when the line executes a suggestion.
    pub(crate) fn on_line_executed(&mut self, line: &str) -> bool {
        match self.take() {
            Self::Suggested { command, pending } if !line.is_empty() => {
                if pending {
                    *self = Self::Armed {
                        suggested: command,
                        executed: line.to_string(),
                    };
                }
                true
            }
            Self::Armed {
                suggested,
                executed,
            } if !line.is_empty() => {
                *self = Self::Armed {
                    suggested,
                    executed,
                };
                false
            }
            _ => false,
        }
    }
}
