//! Error types for the luawk host
//!
//! Script failures never show up here: they are caught by the protected call
//! and surface as `CallOutcome::Failure`. These types cover the host itself
//! (configuration, module resolution, signal plumbing, Lua setup).

use std::io;
use thiserror::Error;

/// Top-level host error
#[derive(Debug, Error)]
pub enum HostError {
    /// Errors raised by the embedded Lua runtime outside the protected call
    #[error("Lua error: {0}")]
    Lua(#[from] mlua::Error),

    /// The interpreter module could not be located
    #[error("module '{name}' not found:{searched}")]
    ModuleNotFound {
        /// Module name that was requested
        name: String,
        /// Locations that were tried, one per line
        searched: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Interrupt bridge errors
    #[error("Interrupt error: {0}")]
    Interrupt(#[from] InterruptError),
}

/// Interrupt bridge errors
#[derive(Debug, Error)]
pub enum InterruptError {
    /// Another host already owns the process-wide interrupt slot
    #[error("another runtime instance is already armed for interruption")]
    AlreadyArmed,

    /// Installing the SIGINT handler failed
    #[error("failed to install SIGINT handler: {0}")]
    Install(#[source] io::Error),

    /// Preparing the checkpoint hook failed, e.g. without a `debug` library
    #[error("failed to prepare interrupt checkpoint: {0}")]
    Hook(#[source] mlua::Error),
}

/// Convenience result alias for interrupt operations
pub type InterruptResult<T> = std::result::Result<T, InterruptError>;

/// Result type using HostError
pub type Result<T> = std::result::Result<T, HostError>;
