//! Build script for `gantry_runtime`
//!
//! Generates a V8 snapshot containing the `gantry_script` extension with
//! `runtime.js` already evaluated, so every session starts without re-running it.

use std::env;
use std::path::PathBuf;

use deno_core::OpState;
use deno_core::extension;
use deno_core::snapshot::CreateSnapshotOptions;
use deno_core::snapshot::create_snapshot;

/// Call an FS capability method (stub)
#[deno_core::op2]
#[serde]
fn op_fs_call(
    _state: &mut OpState,
    #[string] _backend: String,
    #[string] _method: String,
    #[serde] _shape: serde_json::Value,
    #[buffer(copy)] _blob: Vec<u8>,
) -> serde_json::Value {
    serde_json::Value::Null
}

/// Hand pending call arguments to the engine (stub)
#[deno_core::op2]
#[serde]
fn op_script_args(_state: &mut OpState) -> serde_json::Value {
    serde_json::Value::Null
}

/// Receive a script result (stub)
#[deno_core::op2]
fn op_script_result(
    _state: &mut OpState,
    #[serde] _shape: serde_json::Value,
    #[buffer(copy)] _blob: Vec<u8>,
) {
}

/// Forward console output (stub)
#[deno_core::op2(fast)]
fn op_script_log(#[string] _level: String, #[string] _message: String) {}

// Same name, ops and entry point as the runtime extension in lib.rs
extension!(
    gantry_script,
    ops = [
        op_fs_call,
        op_script_args,
        op_script_result,
        op_script_log,
    ],
    esm_entry_point = "ext:gantry_script/runtime.js",
    esm = [ dir "src", "runtime.js" ],
);

fn main() {
    println!("cargo:rerun-if-changed=src/runtime.js");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let snapshot_path = out_dir.join("GANTRY_RUNTIME_SNAPSHOT.bin");

    let snapshot = create_snapshot(
        CreateSnapshotOptions {
            cargo_manifest_dir: env!("CARGO_MANIFEST_DIR"),
            startup_snapshot: None,
            skip_op_registration: false,
            extensions: vec![gantry_script::init()],
            extension_transpiler: None,
            with_runtime_cb: None,
        },
        None,
    )
    .expect("Failed to create snapshot");

    std::fs::write(&snapshot_path, snapshot.output).expect("Failed to write snapshot");

    println!(
        "cargo:rustc-env=GANTRY_RUNTIME_SNAPSHOT={}",
        snapshot_path.display()
    );
}
