//! luawk – process host for the luawk text-processing interpreter
//!
//! The interpreter itself is a Lua module. This crate provides what runs
//! around it:
//! - An embedded Lua 5.4 runtime with the full standard library
//! - The process arguments as a read-only `arg` view (no bulk copy)
//! - Ctrl-C delivered to the running script as a catchable `interrupted!` error
//! - A protected call that turns any error value into one diagnostic with a traceback

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Host runtime modules
pub mod runtime;

// Re-export key types for convenience
pub use runtime::{ArgumentView, CallOutcome, Host, HostConfig};

/// Current version of the luawk host
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
