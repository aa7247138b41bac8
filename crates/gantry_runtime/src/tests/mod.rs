//! Tests for the script runtime
//!
//! Every test here starts real V8 sessions from the runtime snapshot.

mod fs_capability;
mod session;

use gantry_fs::Backends;

/// Backend registry with a `system` backend rooted in a fresh temp directory
pub(crate) fn temp_backends() -> (tempfile::TempDir, Backends) {
    let dir = tempfile::tempdir().expect("temp dir");
    let backends = Backends::new();
    backends
        .register("system", dir.path())
        .expect("register system backend");
    (dir, backends)
}
