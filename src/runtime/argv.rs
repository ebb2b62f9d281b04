//! Read-only view over the process arguments
//!
//! The view is handed to Lua as userdata with `__index` and `__len`
//! metamethods instead of being copied into a table. Index 0 is the program
//! name, `#arg` is the number of arguments after it, and any index outside the
//! vector reads as `nil`.

use mlua::{Integer, Lua, MetaMethod, UserData, UserDataMethods};
use once_cell::sync::Lazy;
use std::borrow::Cow;
use std::env;
use std::ffi::{OsStr, OsString};

/// Global name the view is installed under
pub const ARG_GLOBAL: &str = "arg";

/// Process arguments, captured once and kept for the life of the process.
static PROCESS_ARGS: Lazy<Vec<OsString>> = Lazy::new(|| env::args_os().collect());

/// Non-owning, immutable view over an argument vector
#[derive(Debug, Clone, Copy)]
pub struct ArgumentView {
    args: &'static [OsString],
}

impl ArgumentView {
    /// View over the arguments this process was started with
    pub fn process() -> Self {
        Self {
            args: PROCESS_ARGS.as_slice(),
        }
    }

    /// View over an arbitrary argument vector that outlives the process
    pub fn new(args: &'static [OsString]) -> Self {
        Self { args }
    }

    /// Argument at `index`, or `None` when `index` is outside `[0, count)`
    pub fn get(&self, index: Integer) -> Option<&'static OsStr> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.args.get(index))
            .map(OsString::as_os_str)
    }

    /// Number of arguments, not counting the program name
    pub fn length(&self) -> Integer {
        self.count() as Integer - 1
    }

    /// Number of entries in the underlying vector, program name included
    pub fn count(&self) -> usize {
        self.args.len()
    }

    /// Install the view as the `arg` global of `lua`
    pub fn install(self, lua: &Lua) -> mlua::Result<()> {
        let view = lua.create_userdata(self)?;
        lua.globals().set(ARG_GLOBAL, view)?;
        tracing::debug!(count = self.count(), "installed argument view");
        Ok(())
    }
}

impl UserData for ArgumentView {
    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Index, |lua, view, index: Integer| {
            view.get(index)
                .map(|arg| lua.create_string(arg_bytes(arg)))
                .transpose()
        });
        methods.add_meta_method(MetaMethod::Len, |_, view, ()| Ok(view.length()));
    }
}

#[cfg(unix)]
fn arg_bytes(arg: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(arg.as_bytes())
}

#[cfg(not(unix))]
fn arg_bytes(arg: &OsStr) -> Cow<'_, [u8]> {
    match arg.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}
