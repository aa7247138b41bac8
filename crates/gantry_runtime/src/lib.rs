//! # Gantry Runtime
//!
//! The embedded JavaScript engine behind script processes.
//!
//! ## Overview
//!
//! This crate wraps a `deno_core` runtime with a pre-compiled V8 snapshot of
//! `runtime.js` and provides:
//! - **Sessions**: one isolate each, created and disposed explicitly
//! - **Contexts**: a session's globals with a chosen set of capability bindings
//! - **Value bridge**: lossless translation between [`gantry_value::Value`] and
//!   engine values (bytes as `Uint8Array`, records as plain objects)
//! - **Capabilities**: the `FS` object, backed by [`gantry_fs`]
//! - **Script pool**: dedicated worker threads with a per-job execution limit
//!
//! Console output from scripts goes to the `log` facade under the
//! `gantry_runtime::script` target.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gantry_runtime::{Bindings, Capability, Session};
//!
//! # async fn example() -> Result<(), gantry_runtime::ScriptError> {
//! let mut session = Session::new(gantry_fs::backends().clone())?;
//! let bindings = Bindings::new().with("FS", Capability::Fs);
//!
//! let mut ctx = session.new_context(&bindings)?;
//! ctx.run("function greet(name) { return `hello ${name}`; }").await?;
//! let greeting = ctx.call("greet", vec!["gantry".into()]).await?;
//! assert_eq!(greeting.as_str(), Some("hello gantry"));
//! # Ok(())
//! # }
//! ```

mod bridge;
mod error;
pub mod ops;
mod pool;
mod session;

#[cfg(test)]
mod tests;

pub use error::{CapabilityError, ScriptError};
pub use pool::{DEFAULT_SCRIPT_TIMEOUT, PoolOptions, ScriptJob, ScriptPool};
pub use session::{Bindings, Capability, Context, Session};

/// Pre-compiled V8 snapshot with `runtime.js` evaluated
///
/// Created at build time by `build.rs`.
pub static RUNTIME_SNAPSHOT: &[u8] =
    include_bytes!(concat!(env!("OUT_DIR"), "/GANTRY_RUNTIME_SNAPSHOT.bin"));

// Script runtime extension. Initialize with the backend registry FS objects use.
// The op list and entry point must match the snapshot extension in build.rs.
deno_core::extension!(
    gantry_script,
    ops = [
        ops::op_fs_call,
        ops::op_script_args,
        ops::op_script_result,
        ops::op_script_log,
    ],
    esm_entry_point = "ext:gantry_script/runtime.js",
    esm = [ dir "src", "runtime.js" ],
    options = {
        backends: gantry_fs::Backends,
    },
    state = |state, options| {
        state.put(options.backends);
    },
);
