//! `luawk` – runs the luawk interpreter module on an embedded Lua runtime.
//!
//! Every argument is passed through to the interpreter as `arg`; the host
//! parses no flags of its own. Host settings come from `LUAWK_*` variables.

use luawk::runtime::driver::{self, EXIT_FAILURE, PROGRAM_NAME};
use luawk::runtime::{ArgumentView, HostConfig};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config = match HostConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            init_tracing(&HostConfig::default().log_filter);
            eprintln!("{PROGRAM_NAME}: {err}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    init_tracing(&config.log_filter);
    tracing::debug!(version = luawk::VERSION, module = %config.entry_module, "starting");

    ExitCode::from(driver::run(config, ArgumentView::process()))
}

/// Logs go to stderr so they never mix with the interpreter's output
fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
