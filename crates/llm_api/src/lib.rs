//! Cancellable single-shot JSON transport for the assistant providers.
//!
//! One call is one HTTP POST. The caller's [`CancelToken`] can interrupt it at
//! any point; an OS interrupt reaches the token through [`SigintGuard`].
//! Nothing in this crate knows about provider payload shapes.

pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod headers;
pub mod interrupt;

pub use cancel::CancelToken;
pub use config::{AuthStyle, EngineConfig};
pub use engine::{EngineRequest, HttpEngine};
pub use error::EngineError;
pub use interrupt::SigintGuard;
