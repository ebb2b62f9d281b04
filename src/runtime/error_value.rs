//! Normalization of Lua error values into diagnostic text
//!
//! A failed call can leave any Lua value behind. `ErrorValue` sorts it into
//! text, an object with a `__tostring` conversion, or an opaque object, and
//! `into_message` always produces a string.

use mlua::{Function, Lua, Table, Value};

/// Error value left by a failed protected call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorValue {
    /// A string, or a number coerced to one
    Text(String),
    /// Result of the value's `__tostring` metamethod
    Convertible(String),
    /// No textual form; only the Lua type name is known
    Opaque {
        /// Lua type name as reported by `type()`
        type_name: &'static str,
    },
}

impl ErrorValue {
    /// Classify a Lua error value
    pub fn from_lua<'lua>(lua: &'lua Lua, value: Value<'lua>) -> Self {
        match value {
            Value::String(s) => ErrorValue::Text(s.to_string_lossy().into_owned()),
            Value::Integer(_) | Value::Number(_) => match lua.coerce_string(value.clone()) {
                Ok(Some(s)) => ErrorValue::Text(s.to_string_lossy().into_owned()),
                _ => ErrorValue::Opaque {
                    type_name: lua_type_name(&value),
                },
            },
            // Errors raised from Rust callbacks carry a Rust error
            Value::Error(err) => ErrorValue::Convertible(root_message(&err)),
            other => match call_tostring(lua, &other) {
                Some(text) => ErrorValue::Convertible(text),
                None => ErrorValue::Opaque {
                    type_name: lua_type_name(&other),
                },
            },
        }
    }

    /// Final message for this value
    pub fn into_message(self) -> String {
        match self {
            ErrorValue::Text(text) | ErrorValue::Convertible(text) => text,
            ErrorValue::Opaque { type_name } => {
                format!("(error object is a {type_name} value)")
            }
        }
    }
}

/// Message of the innermost error behind any callback wrappers
fn root_message(err: &mlua::Error) -> String {
    match err {
        mlua::Error::CallbackError { cause, .. } => root_message(cause),
        mlua::Error::RuntimeError(message) => message.clone(),
        other => other.to_string(),
    }
}

/// Invoke the raw `__tostring` metamethod, keeping the result only if it is a string
fn call_tostring<'lua>(lua: &'lua Lua, value: &Value<'lua>) -> Option<String> {
    let metatable = raw_metatable(lua, value)?;
    let tostring = metatable
        .raw_get::<_, Option<Function<'_>>>("__tostring")
        .ok()
        .flatten()?;

    match tostring.call::<_, Value<'_>>(value.clone()) {
        Ok(Value::String(s)) => Some(s.to_string_lossy().into_owned()),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(error = %err, "__tostring on error object failed");
            None
        }
    }
}

fn raw_metatable<'lua>(lua: &'lua Lua, value: &Value<'lua>) -> Option<Table<'lua>> {
    if let Value::Table(table) = value {
        return table.get_metatable();
    }

    // debug.getmetatable ignores __metatable and works for every type
    let debug: Table<'_> = lua.globals().raw_get("debug").ok()?;
    let getmetatable: Function<'_> = debug.raw_get("getmetatable").ok()?;
    getmetatable.call::<_, Option<Table<'_>>>(value.clone()).ok().flatten()
}

/// Type name as Lua's `type()` reports it
pub fn lua_type_name(value: &Value<'_>) -> &'static str {
    match value {
        Value::Nil => "nil",
        Value::Boolean(_) => "boolean",
        Value::LightUserData(_) | Value::UserData(_) | Value::Error(_) => "userdata",
        Value::Integer(_) | Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Table(_) => "table",
        Value::Function(_) => "function",
        Value::Thread(_) => "thread",
    }
}
