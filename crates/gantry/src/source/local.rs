use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use gantry_fs::{Backends, FsError, FsObject};

use super::{ContentSource, RepoError};

const BACKEND: &str = "source";

/// Scripts from a local directory
///
/// Paths are confined to the root the same way FS backends are.
pub(crate) struct LocalSource {
    files: FsObject,
}

impl LocalSource {
    pub(crate) fn new(root: &Path) -> Result<Self> {
        let backends = Backends::new();
        backends
            .register(BACKEND, root)
            .with_context(|| format!("Invalid script source {}", root.display()))?;
        Ok(Self {
            files: FsObject::with_backends(BACKEND, backends),
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, RepoError>
    where
        T: Send + 'static,
        F: FnOnce(&FsObject) -> Result<T, FsError> + Send + 'static,
    {
        let files = self.files.clone();
        tokio::task::spawn_blocking(move || f(&files))
            .await
            .map_err(|e| RepoError::Listing(e.to_string()))?
            .map_err(|e| match e {
                FsError::NotFound(path) => RepoError::NotFound(format!("{path} not found")),
                other => RepoError::Fs(other),
            })
    }
}

#[async_trait]
impl ContentSource for LocalSource {
    async fn content(&self, path: &str) -> Result<Vec<u8>, RepoError> {
        let path = path.to_string();
        self.blocking(move |files| files.read_file_buffer(&path)).await
    }

    async fn dir(&self, path: &str) -> Result<Vec<String>, RepoError> {
        let path = path.to_string();
        self.blocking(move |files| files.read_dir(&path, false)).await
    }
}
