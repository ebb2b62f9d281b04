//! Process-level sequencing: host startup, the single protected call, and the
//! mapping from outcome to exit status.

use std::io::{self, Write};

use super::HostConfig;
use super::argv::ArgumentView;
use super::error::Result;
use super::host::Host;
use super::reporter::CallOutcome;

/// Exit status for a run that returned normally
pub const EXIT_SUCCESS: u8 = 0;
/// Exit status for any reported failure
pub const EXIT_FAILURE: u8 = 1;

/// Program name used to prefix host-level diagnostics
pub const PROGRAM_NAME: &str = "luawk";

/// Run the interpreter once and return the process exit status.
///
/// Diagnostics go to stderr. The Lua state is closed before this returns.
pub fn run(config: HostConfig, arguments: ArgumentView) -> u8 {
    let stderr = io::stderr();
    let mut stderr = stderr.lock();
    run_with(config, arguments, &mut stderr)
}

/// Like [`run`], writing diagnostics to `diagnostics`
pub fn run_with<W: Write>(config: HostConfig, arguments: ArgumentView, diagnostics: &mut W) -> u8 {
    match execute(config, arguments) {
        Ok(outcome) => report(outcome, diagnostics),
        Err(err) => {
            tracing::debug!(error = %err, "host setup failed");
            write_line(diagnostics, &format!("{PROGRAM_NAME}: {err}"));
            EXIT_FAILURE
        }
    }
}

fn execute(config: HostConfig, arguments: ArgumentView) -> Result<CallOutcome> {
    let host = Host::new(config)?;
    host.install_arguments(arguments)?;
    host.run()
}

/// Write the outcome's diagnostic, if any, and map it to an exit status
pub fn report<W: Write>(outcome: CallOutcome, diagnostics: &mut W) -> u8 {
    match outcome {
        CallOutcome::Success { .. } => EXIT_SUCCESS,
        CallOutcome::Failure { message } => {
            if let Some(message) = message {
                write_line(diagnostics, &message);
            }
            EXIT_FAILURE
        }
    }
}

fn write_line<W: Write>(out: &mut W, line: &str) {
    // Nothing sensible is left to do if stderr itself is gone.
    let _ = writeln!(out, "{line}").and_then(|_| out.flush());
}
