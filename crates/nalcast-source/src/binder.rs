//! Per-callback binding to the host runtime.
//!
//! The decoder invokes the source callbacks on threads it owns, and a
//! session may see a different thread on every call. Each callback therefore
//! starts by asking its [`ThreadBinder`] for a context valid on the current
//! thread. Binders never hand out a context cached from an earlier call.

use std::sync::OnceLock;

use crate::error::BindError;

/// Produces a host-runtime context for the calling thread.
///
/// Binding is acquire-only: a thread attached by `bind` stays attached.
pub trait ThreadBinder: Send {
    /// The per-thread context queue and payload handles are driven with.
    type Context;

    /// Obtain a context for the current thread.
    fn bind(&self) -> Result<Self::Context, BindError>;
}

/// Binder for sources whose producer lives in the same Rust process.
#[derive(Debug, Clone, Copy, Default)]
pub struct InProcess;

impl ThreadBinder for InProcess {
    type Context = ();

    fn bind(&self) -> Result<(), BindError> {
        Ok(())
    }
}

/// A process-wide runtime capability, set once and never torn down.
///
/// Holds the handle the host hands over at load time (a `JavaVM`, for
/// instance). Sessions borrow it for the lifetime of the process.
pub struct GlobalRuntime<T> {
    cell: OnceLock<T>,
    name: &'static str,
}

impl<T> GlobalRuntime<T> {
    /// An empty cell. Usable in a `static`.
    pub const fn new(name: &'static str) -> Self {
        Self {
            cell: OnceLock::new(),
            name,
        }
    }

    /// Store the runtime handle. Returns `false` if one was already set, in
    /// which case the first value is kept.
    pub fn init(&self, value: T) -> bool {
        let stored = self.cell.set(value).is_ok();
        if stored {
            tracing::info!(runtime = self.name, "Host runtime initialised");
        } else {
            tracing::warn!(
                runtime = self.name,
                "Host runtime already initialised, keeping the first handle"
            );
        }
        stored
    }

    /// The stored handle.
    pub fn get(&self) -> Result<&T, BindError> {
        self.cell.get().ok_or(BindError::Uninitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}
