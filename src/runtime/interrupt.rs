//! SIGINT to Lua error bridge
//!
//! The OS handler cannot touch the Lua state, so it only flips a latch and
//! puts SIGINT back to its default disposition. A native hook polls the latch
//! on every call, every return and every `checkpoint_interval` instructions.
//! When it finds the latch set it swaps in a Lua hook that raises the plain
//! string `interrupted!` at the next instruction, so scripts catch an ordinary
//! Lua error. A second SIGINT before the script gets there kills the process.
//!
//! Each host owns its latch. The handler can only signal one of them, so a
//! process-wide slot points at the latch of the armed host and arming is
//! exclusive.

use std::io;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

use mlua::{Function, HookTriggers, Lua, RegistryKey, Table};

use super::error::{InterruptError, InterruptResult};

/// Message carried by the error raised at the checkpoint
pub const INTERRUPTED_MESSAGE: &str = "interrupted!";

/// Latch of the currently armed host; null when idle.
static ARMED: AtomicPtr<AtomicBool> = AtomicPtr::new(ptr::null_mut());

/// One-shot interrupt latch owned by a single runtime instance
#[derive(Debug, Clone, Default)]
pub struct InterruptToken(Arc<AtomicBool>);

impl InterruptToken {
    /// Create a cleared latch
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the latch, as the OS handler does
    pub fn trip(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether an interrupt is pending
    pub fn is_tripped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Consume a pending interrupt
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn as_ptr(&self) -> *mut AtomicBool {
        Arc::as_ptr(&self.0).cast_mut()
    }
}

/// Observable bridge state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// No call in flight for this token
    Idle,
    /// A call is in flight and SIGINT is routed to this token
    Armed,
    /// An interrupt was received and waits for the next checkpoint
    Tripped,
}

/// Arms a Lua state for interruption around a single call
#[derive(Debug, Clone)]
pub struct InterruptBridge {
    token: InterruptToken,
    checkpoint_interval: u32,
}

impl InterruptBridge {
    /// Create a bridge that checks for interrupts every `checkpoint_interval`
    /// VM instructions (clamped to at least 1)
    pub fn new(token: InterruptToken, checkpoint_interval: u32) -> Self {
        Self {
            token,
            checkpoint_interval: checkpoint_interval.max(1),
        }
    }

    /// The latch this bridge arms
    pub fn token(&self) -> &InterruptToken {
        &self.token
    }

    /// Current state of this bridge
    pub fn state(&self) -> BridgeState {
        if ARMED.load(Ordering::SeqCst) != self.token.as_ptr() {
            BridgeState::Idle
        } else if self.token.is_tripped() {
            BridgeState::Tripped
        } else {
            BridgeState::Armed
        }
    }

    /// Route SIGINT to this bridge and install the checkpoint hook on `lua`.
    ///
    /// Everything is undone when the returned guard is dropped.
    pub fn arm<'a>(&'a self, lua: &'a Lua) -> InterruptResult<ArmGuard<'a>> {
        ARMED
            .compare_exchange(
                ptr::null_mut(),
                self.token.as_ptr(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|_| InterruptError::AlreadyArmed)?;

        self.token.clear();
        let guard = ArmGuard { bridge: self, lua };

        let raise_next = raise_at_next_instruction(lua).map_err(InterruptError::Hook)?;
        let token = self.token.clone();
        lua.set_hook(
            HookTriggers::new()
                .on_calls()
                .on_returns()
                .every_nth_instruction(self.checkpoint_interval),
            move |lua, _debug| {
                if token.take() {
                    tracing::debug!("interrupt reached checkpoint");
                    lua.registry_value::<Function<'_>>(&raise_next)?
                        .call::<_, ()>(())?;
                }
                Ok(())
            },
        );

        if let Err(err) = install_handler() {
            // guard drop restores the idle state
            drop(guard);
            return Err(InterruptError::Install(err));
        }

        tracing::debug!(
            checkpoint_interval = self.checkpoint_interval,
            "armed interrupt bridge"
        );
        Ok(guard)
    }
}

/// Lua side of the checkpoint. Calling the returned function replaces the
/// current hook with one that removes itself and raises `interrupted!` as a
/// plain string, which a native hook cannot do.
const RAISE_HOOK: &str = r#"
local sethook, message = ...
local function raise()
    sethook()
    error(message, 0)
end
return function()
    sethook(raise, "", 1)
end
"#;

fn raise_at_next_instruction(lua: &Lua) -> mlua::Result<RegistryKey> {
    let debug: Table<'_> = lua.globals().raw_get("debug")?;
    let sethook: Function<'_> = debug.raw_get("sethook")?;
    let schedule: Function<'_> = lua
        .load(RAISE_HOOK)
        .set_name("=interrupt")
        .call((sethook, INTERRUPTED_MESSAGE))?;
    lua.create_registry_value(schedule)
}

/// Keeps a bridge armed; dropping it returns the bridge to idle
#[derive(Debug)]
pub struct ArmGuard<'a> {
    bridge: &'a InterruptBridge,
    lua: &'a Lua,
}

impl Drop for ArmGuard<'_> {
    fn drop(&mut self) {
        restore_default();
        self.lua.remove_hook();
        ARMED.store(ptr::null_mut(), Ordering::SeqCst);
        self.bridge.token.clear();
        tracing::debug!("disarmed interrupt bridge");
    }
}

extern "C" fn on_interrupt(signal: libc::c_int) {
    // Only async-signal-safe work here: reset the disposition, set the latch.
    unsafe {
        libc::signal(signal, libc::SIG_DFL);
    }
    let latch = ARMED.load(Ordering::SeqCst);
    if !latch.is_null() {
        // SAFETY: the slot only holds latches kept alive by an armed bridge.
        unsafe { (*latch).store(true, Ordering::SeqCst) };
    }
}

fn install_handler() -> io::Result<()> {
    let handler = on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: `on_interrupt` only performs async-signal-safe operations.
    let previous = unsafe { libc::signal(libc::SIGINT, handler) };
    if previous == libc::SIG_ERR {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn restore_default() {
    // SAFETY: resetting to SIG_DFL has no preconditions.
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_DFL);
    }
}

/// Whether SIGINT currently has the default disposition
#[cfg(unix)]
pub fn sigint_is_default() -> bool {
    // SAFETY: a null `act` only queries the current disposition.
    unsafe {
        let mut current: libc::sigaction = std::mem::zeroed();
        libc::sigaction(libc::SIGINT, ptr::null(), &mut current) == 0
            && current.sa_sigaction == libc::SIG_DFL
    }
}
