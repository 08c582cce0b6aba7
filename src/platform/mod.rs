//! Unix terminal plumbing for the scrollback relay.

pub mod fd;
pub mod relay;
pub mod signals;

pub use fd::is_tty;
pub use relay::{activate, exit_code, RelayError, RelayOutcome, SkipReason};
pub use signals::{SignalForwarder, FORWARDED_SIGNALS};
