//! The `yo` assistant: turns `yo <question>` lines into one suggested command
//! or chat answer, with follow-ups for terminal output and documentation.
//!
//! # Public API Overview
//! - Drive a shell line loop through [`Session::accept`] and
//!   [`Session::on_prompt`].
//! - Render results through a [`Host`]; [`TerminalHost`] writes to any
//!   `io::Write`.
//! - Providers come from a [`ProviderFactory`] once per exchange;
//!   [`HttpProviderFactory`] reads [`AssistConfig`] each time.

pub mod config;
pub mod continuation;
pub mod error;
pub mod host;
pub mod prompt;
pub mod provider;
pub mod session;

pub use config::AssistConfig;
pub use continuation::Continuation;
pub use error::{AssistError, ConfigError};
pub use host::{Host, ScrollbackSource, TerminalHost};
pub use provider::{Connection, HttpProviderFactory, ProviderFactory};
pub use session::{LineAction, Session};
