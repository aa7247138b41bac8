//! Deno ops behind the script runtime
//!
//! These ops expose capability objects and the host call protocol to `runtime.js`

use deno_core::OpState;
use deno_core::op2;
use gantry_fs::{Backends, FsObject};
use gantry_value::Value;

use crate::bridge::{self, EngineOwned};
use crate::error::{CapabilityError, ScriptError};

/// Log target for console output coming from scripts
pub const SCRIPT_LOG_TARGET: &str = "gantry_runtime::script";

/// Arguments waiting to be picked up by `op_script_args`
pub(crate) struct PendingArgs(pub(crate) Vec<Value>);

/// Result delivered by `op_script_result`
pub(crate) struct ScriptOutcome(pub(crate) Result<Value, ScriptError>);

/// Call a method on an FS capability object
#[op2]
#[serde]
#[allow(clippy::needless_pass_by_value)]
pub(crate) fn op_fs_call(
    state: &mut OpState,
    #[string] backend: String,
    #[string] method: String,
    #[serde] shape: Value,
    #[buffer(copy)] blob: Vec<u8>,
) -> Result<EngineOwned, CapabilityError> {
    let args = match bridge::decode(shape, &blob)? {
        Value::Array(args) => args,
        other => vec![other],
    };
    let backends = state.borrow::<Backends>().clone();
    let result = FsObject::with_backends(backend, backends).call(&method, &args)?;
    Ok(EngineOwned(result))
}

/// Hand the arguments of the current host call to the engine
#[op2]
#[serde]
pub(crate) fn op_script_args(state: &mut OpState) -> EngineOwned {
    let args = state
        .try_take::<PendingArgs>()
        .map(|PendingArgs(args)| args)
        .unwrap_or_default();
    EngineOwned(Value::Array(args))
}

/// Receive the encoded result of a script evaluation
#[op2]
pub(crate) fn op_script_result(
    state: &mut OpState,
    #[serde] shape: Value,
    #[buffer(copy)] blob: Vec<u8>,
) {
    state.put(ScriptOutcome(bridge::decode(shape, &blob)));
}

/// Forward `console.*` output to the `log` facade
#[op2(fast)]
#[allow(clippy::needless_pass_by_value)]
pub(crate) fn op_script_log(#[string] level: String, #[string] message: String) {
    let level = match level.as_str() {
        "error" => log::Level::Error,
        "warn" => log::Level::Warn,
        "debug" => log::Level::Debug,
        "trace" => log::Level::Trace,
        _ => log::Level::Info,
    };
    log::log!(target: SCRIPT_LOG_TARGET, level, "{message}");
}
