//! The process-wide `JavaVM` and the per-callback thread binder.

use jni::{JNIEnv, JavaVM};
use nalcast_source::{BindError, GlobalRuntime, ThreadBinder};
use tracing::trace;

/// Set once by `JNI_OnLoad`.
pub static RUNTIME: GlobalRuntime<JavaVM> = GlobalRuntime::new("JavaVM");

/// Attaches whichever thread runs a callback to the JVM.
///
/// libVLC calls back on its own worker threads. Attachments are permanent:
/// the thread is detached by the JVM when it exits, never by the binder.
#[derive(Debug, Clone, Copy, Default)]
pub struct JniBinder;

impl ThreadBinder for JniBinder {
    type Context = JNIEnv<'static>;

    fn bind(&self) -> Result<Self::Context, BindError> {
        let vm = RUNTIME.get()?;
        let env = vm
            .attach_current_thread_permanently()
            .map_err(|e| BindError::Attach(e.to_string()))?;
        trace!("Bound callback thread to JVM");
        Ok(env)
    }
}
