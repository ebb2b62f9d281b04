//! Host runtime and public API
//!
//! This module provides the `Host` that owns the embedded Lua state, the
//! pieces it is built from (argument view, interrupt bridge, protected call)
//! and the driver that turns one run into a process exit status.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// Submodules
pub mod argv;
pub mod config;
pub mod driver;
pub mod error;
pub mod error_value;
pub mod host;
pub mod interrupt;
pub mod reporter;

pub use argv::ArgumentView;
pub use error::{HostError, InterruptError, Result};
pub use error_value::ErrorValue;
pub use host::Host;
pub use interrupt::{BridgeState, InterruptBridge, InterruptToken};
pub use reporter::CallOutcome;

/// Configuration for the luawk host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Name of the interpreter module whose loader is the entry point
    pub entry_module: String,

    /// Directories searched for the module before the default `package.path`
    pub module_paths: Vec<PathBuf>,

    /// VM instructions between interrupt checkpoints
    pub checkpoint_interval: u32,

    /// Tracing filter directive for the binary
    pub log_filter: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            entry_module: "luawk".to_string(),
            module_paths: Vec::new(),
            checkpoint_interval: 1000,
            log_filter: "warn".to_string(),
        }
    }
}

impl HostConfig {
    /// Check the invariants the host relies on
    pub fn validate(&self) -> Result<()> {
        if self.entry_module.trim().is_empty() {
            return Err(HostError::Config("entry_module must not be empty".to_string()));
        }
        if self.checkpoint_interval == 0 {
            return Err(HostError::Config(
                "checkpoint_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
