//! Base types and error handling.
//!
//! - [`ConfigError`] and [`RuntimeError`]: the error taxonomy
//! - [`LifecycleState`]: connection and application lifecycle
//! - [`CloseGate`]: the latch `main` waits on

pub mod error;
pub mod gate;
pub mod lifecycle;

pub use error::{ConfigError, RuntimeError};
pub use gate::CloseGate;
pub use lifecycle::LifecycleState;

#[cfg(test)]
mod tests;
