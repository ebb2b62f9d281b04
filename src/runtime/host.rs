//! The embedded Lua runtime and its entry point
//!
//! A `Host` owns one Lua state with the full standard library, its interrupt
//! latch and the configuration it was built from. Dropping the host closes
//! the Lua state.

use mlua::{Function, Lua, Table};
use std::path::PathBuf;

use super::HostConfig;
use super::argv::ArgumentView;
use super::error::{HostError, Result};
use super::interrupt::{InterruptBridge, InterruptToken};
use super::reporter::{self, CallOutcome};

/// Embedded runtime hosting the interpreter module
#[derive(Debug)]
pub struct Host {
    lua: Lua,
    config: HostConfig,
    bridge: InterruptBridge,
}

impl Host {
    /// Create a Lua state with all standard libraries and the configured
    /// module directories on `package.path`
    pub fn new(config: HostConfig) -> Result<Self> {
        config.validate()?;

        // SAFETY: the interpreter module may load C modules and relies on the
        // `debug` library, so the state gets the full, unrestricted library set.
        let lua = unsafe { Lua::unsafe_new() };
        let bridge = InterruptBridge::new(InterruptToken::new(), config.checkpoint_interval);
        let host = Self {
            lua,
            config,
            bridge,
        };

        host.prepend_module_paths()?;
        Ok(host)
    }

    /// The embedded Lua state
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Configuration the host was built from
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Interrupt bridge used for protected calls
    pub fn bridge(&self) -> &InterruptBridge {
        &self.bridge
    }

    /// Expose `arguments` to Lua as the `arg` global
    pub fn install_arguments(&self, arguments: ArgumentView) -> Result<()> {
        arguments.install(&self.lua)?;
        Ok(())
    }

    /// Locate the entry point: `package.preload[entry_module]` when present,
    /// otherwise the first match for the module on `package.path`
    pub fn resolve_entry(&self) -> Result<Function<'_>> {
        let name = self.config.entry_module.as_str();
        let package: Table<'_> = self.lua.globals().get("package")?;

        let preload: Table<'_> = package.get("preload")?;
        if let Some(loader) = preload.get::<_, Option<Function<'_>>>(name)? {
            tracing::debug!(module = name, "entry point found in package.preload");
            return Ok(loader);
        }

        let searchpath: Function<'_> = package.get("searchpath")?;
        let path: String = package.get("path")?;
        let (found, searched): (Option<String>, Option<String>) =
            searchpath.call((name, path))?;

        match found {
            Some(file) => {
                tracing::debug!(module = name, file = %file, "entry point found on package.path");
                let entry = self.lua.load(PathBuf::from(file)).into_function()?;
                Ok(entry)
            }
            None => Err(HostError::ModuleNotFound {
                name: name.to_string(),
                searched: format!(
                    "\n\tno field package.preload['{name}']{}",
                    searched.unwrap_or_default()
                ),
            }),
        }
    }

    /// Compile `source` into an entry point named `name`
    pub fn load_entry(&self, source: &str, name: &str) -> Result<Function<'_>> {
        let entry = self.lua.load(source).set_name(name).into_function()?;
        Ok(entry)
    }

    /// Run `entry` under the protected call
    pub fn call<'lua>(&'lua self, entry: Function<'lua>) -> Result<CallOutcome> {
        reporter::protected_call(&self.lua, &self.bridge, entry)
    }

    /// Resolve the entry point and run it
    pub fn run(&self) -> Result<CallOutcome> {
        let entry = self.resolve_entry()?;
        self.call(entry)
    }

    fn prepend_module_paths(&self) -> Result<()> {
        if self.config.module_paths.is_empty() {
            return Ok(());
        }

        let package: Table<'_> = self.lua.globals().get("package")?;
        let current: String = package.get("path")?;
        let mut path = String::new();
        for dir in &self.config.module_paths {
            let dir = dir.to_string_lossy();
            path.push_str(&format!("{dir}/?.lua;{dir}/?/init.lua;"));
        }
        path.push_str(&current);

        tracing::debug!(path = %path, "configured package.path");
        package.set("path", path)?;
        Ok(())
    }
}
