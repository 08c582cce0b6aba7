//! Terminal side of the `yo` assistant.
//!
//! Invariant: only the relay pump writes to the real terminal once
//! [`activate`] has split the process; the session sees a pty slave.
//!
//! # Public API Overview
//! - Split into pump and session with [`activate`].
//! - Read captured output through [`ScrollbackHandle`].
//! - Load environment settings with [`EnvConfig::from_env`] and route
//!   diagnostics to a file with [`logging::init_from_env`].

pub mod config;
pub mod logging;
pub mod platform;
pub mod scrollback;

pub use crate::config::EnvConfig;
pub use crate::platform::{activate, RelayError, RelayOutcome, SkipReason};
pub use crate::scrollback::{RingStats, ScrollbackHandle, ScrollbackRing};
