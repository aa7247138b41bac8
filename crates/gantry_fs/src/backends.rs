use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::error::FsError;

static BACKENDS: LazyLock<Backends> = LazyLock::new(Backends::new);

/// Process-wide backend registry used by `FsObject::new` and the script runtime
pub fn backends() -> &'static Backends {
    &BACKENDS
}

/// Registry of named filesystem backends
///
/// Cloning yields another handle onto the same table, so a registry handed to a
/// script session sees backends registered afterwards.
#[derive(Clone, Default)]
pub struct Backends {
    roots: Arc<RwLock<HashMap<String, PathBuf>>>,
}

impl Backends {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a backend rooted at an existing directory
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidRoot`] if `root` cannot be canonicalized or is not a directory
    pub fn register(&self, name: &str, root: impl AsRef<Path>) -> Result<PathBuf, FsError> {
        let root = root.as_ref();
        let invalid = |reason: String| FsError::InvalidRoot {
            name: name.to_string(),
            root: root.display().to_string(),
            reason,
        };

        let canonical = root.canonicalize().map_err(|e| invalid(e.to_string()))?;
        if !canonical.is_dir() {
            return Err(invalid("not a directory".into()));
        }

        log::debug!(
            "Registered filesystem backend {name} at {}",
            canonical.display()
        );
        self.roots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), canonical.clone());
        Ok(canonical)
    }

    /// Canonical root of a backend
    pub fn get(&self, name: &str) -> Option<PathBuf> {
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Like [`get`](Self::get), failing with [`FsError::NoBackend`]
    ///
    /// # Errors
    ///
    /// Returns [`FsError::NoBackend`] when nothing is registered under `name`
    pub fn resolve(&self, name: &str) -> Result<PathBuf, FsError> {
        self.get(name)
            .ok_or_else(|| FsError::NoBackend(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered backend names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn remove(&self, name: &str) -> bool {
        self.roots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_canonicalizes_root() {
        let dir = tempfile::tempdir().unwrap();
        let backends = Backends::new();

        let root = backends.register("data", dir.path()).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
        assert_eq!(backends.get("data"), Some(root));
        assert!(backends.has("data"));
        assert_eq!(backends.names(), vec!["data".to_string()]);
    }

    #[test]
    fn register_rejects_missing_and_file_roots() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();
        let backends = Backends::new();

        assert!(matches!(
            backends.register("gone", dir.path().join("missing")),
            Err(FsError::InvalidRoot { .. })
        ));
        assert!(matches!(
            backends.register("file", &file),
            Err(FsError::InvalidRoot { .. })
        ));
        assert!(backends.names().is_empty());
    }

    #[test]
    fn clones_share_state() {
        let dir = tempfile::tempdir().unwrap();
        let backends = Backends::new();
        let handle = backends.clone();

        handle.register("system", dir.path()).unwrap();
        assert!(backends.has("system"));
        assert!(backends.remove("system"));
        assert!(matches!(
            handle.resolve("system"),
            Err(FsError::NoBackend(name)) if name == "system"
        ));
    }
}
