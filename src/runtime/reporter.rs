//! Protected call around the interpreter entry point
//!
//! The entry point runs under `xpcall` with a Rust message handler. The handler
//! runs while the failing stack is still intact, turns whatever was raised into
//! text and appends a traceback starting at the failing frame. The interrupt
//! bridge is armed only for the duration of the call.

use mlua::{Function, Integer, Lua, MultiValue, Table, Value};

use super::error::Result;
use super::error_value::ErrorValue;
use super::interrupt::InterruptBridge;

/// `debug.traceback` level that skips the message handler itself
pub const TRACEBACK_LEVEL: Integer = 2;

/// Result of one protected call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The entry point returned normally
    Success {
        /// Number of values it returned
        returns: usize,
    },
    /// The entry point raised an error
    Failure {
        /// Normalized message with traceback, if it could be read as text
        message: Option<String>,
    },
}

impl CallOutcome {
    /// Whether the call returned normally
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success { .. })
    }

    /// Failure message, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            CallOutcome::Failure { message } => message.as_deref(),
            CallOutcome::Success { .. } => None,
        }
    }
}

/// Build the message handler passed to `xpcall`
pub fn message_handler(lua: &Lua) -> mlua::Result<Function<'_>> {
    lua.create_function(|lua, value: Value<'_>| {
        let message = ErrorValue::from_lua(lua, value).into_message();
        Ok(with_traceback(lua, message))
    })
}

/// Append the current call stack to `message`
fn with_traceback(lua: &Lua, message: String) -> String {
    let traceback = lua
        .globals()
        .raw_get::<_, Table<'_>>("debug")
        .and_then(|debug| debug.raw_get::<_, Function<'_>>("traceback"))
        .and_then(|traceback| {
            traceback.call::<_, mlua::String<'_>>((message.as_str(), TRACEBACK_LEVEL))
        });

    match traceback {
        Ok(text) => text.to_string_lossy().into_owned(),
        Err(err) => {
            tracing::debug!(error = %err, "traceback unavailable");
            message
        }
    }
}

/// Call `entry` with no arguments under the message handler, with the
/// interrupt bridge armed for exactly the duration of the call
pub fn protected_call<'lua>(
    lua: &'lua Lua,
    bridge: &InterruptBridge,
    entry: Function<'lua>,
) -> Result<CallOutcome> {
    let handler = message_handler(lua)?;
    let xpcall: Function<'_> = lua.globals().raw_get("xpcall")?;

    let results = {
        let _armed = bridge.arm(lua)?;
        xpcall.call::<_, MultiValue<'_>>((entry, handler))
    };

    let outcome = match results {
        Ok(values) => outcome_from_results(lua, values),
        // xpcall itself failed (e.g. out of memory before the handler ran)
        Err(err) => CallOutcome::Failure {
            message: Some(err.to_string()),
        },
    };

    match &outcome {
        CallOutcome::Success { returns } => {
            tracing::debug!(returns = *returns, "entry point returned")
        }
        CallOutcome::Failure { .. } => tracing::debug!("entry point failed"),
    }
    Ok(outcome)
}

fn outcome_from_results<'lua>(lua: &'lua Lua, values: MultiValue<'lua>) -> CallOutcome {
    let mut values = values.into_iter();
    match values.next() {
        Some(Value::Boolean(true)) => CallOutcome::Success {
            returns: values.count(),
        },
        _ => CallOutcome::Failure {
            message: values.next().and_then(|value| failure_text(lua, value)),
        },
    }
}

fn failure_text<'lua>(lua: &'lua Lua, value: Value<'lua>) -> Option<String> {
    lua.coerce_string(value)
        .ok()
        .flatten()
        .map(|text| text.to_string_lossy().into_owned())
}
