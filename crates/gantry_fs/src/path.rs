//! Virtual path handling
//!
//! Paths seen by scripts are rooted at the backend root: `/` is the root itself,
//! relative paths are taken from it as well. Resolution happens in two steps:
//!
//! 1. Lexical: `.` is dropped and `..` pops a component. Climbing above the root
//!    is refused outright.
//! 2. Physical: the deepest ancestor that exists on disk is canonicalized and must
//!    still sit under the canonical root, which blocks escapes through symlinks.

use std::path::{Component, Path, PathBuf};

use crate::error::FsError;

/// A backend root that virtual paths are resolved against
#[derive(Debug, Clone)]
pub(crate) struct Jail {
    root: PathBuf,
}

impl Jail {
    /// `root` must already be canonical (see `Backends::register`)
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// Map a virtual path onto the host filesystem
    pub(crate) fn resolve(&self, virtual_path: &str) -> Result<PathBuf, FsError> {
        let parts = normalize(virtual_path)?;
        let joined = parts
            .iter()
            .fold(self.root.clone(), |acc, part| acc.join(part));

        let mut ancestor = joined.as_path();
        loop {
            if ancestor.exists() {
                let canonical = ancestor
                    .canonicalize()
                    .map_err(|e| FsError::from_io(virtual_path, e))?;
                if !canonical.starts_with(&self.root) {
                    log::warn!("Refusing {virtual_path}: resolves outside its backend");
                    return Err(FsError::PermissionDenied(virtual_path.to_string()));
                }
                let suffix = joined.strip_prefix(ancestor).unwrap_or(Path::new(""));
                return Ok(if suffix.as_os_str().is_empty() {
                    canonical
                } else {
                    canonical.join(suffix)
                });
            }
            match ancestor.parent() {
                Some(parent) => ancestor = parent,
                // the root itself vanished
                None => return Err(FsError::NotFound(virtual_path.to_string())),
            }
        }
    }

    /// Map a virtual path onto the host filesystem without following its last component
    ///
    /// The parent directory is resolved and checked like [`resolve`](Self::resolve);
    /// the final name is joined as is, so a symlink there names the link itself.
    pub(crate) fn resolve_entry(&self, virtual_path: &str) -> Result<PathBuf, FsError> {
        let parts = normalize(virtual_path)?;
        let Some((name, parents)) = parts.split_last() else {
            return Ok(self.root.clone());
        };
        let parent = self.resolve(&parents.join("/"))?;
        Ok(parent.join(name))
    }

    /// Virtual form of a host path under this root
    pub(crate) fn to_virtual(&self, real: &Path) -> String {
        let relative = real.strip_prefix(&self.root).unwrap_or(real);
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        format!("/{}", parts.join("/"))
    }
}

fn normalize(virtual_path: &str) -> Result<Vec<&str>, FsError> {
    let mut parts = Vec::new();
    for segment in virtual_path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(FsError::PermissionDenied(virtual_path.to_string()));
                }
            }
            other => parts.push(other),
        }
    }
    Ok(parts)
}

/// Last element of a path, ignoring trailing separators
pub(crate) fn base_name(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.is_empty() { ".".into() } else { "/".into() };
    }
    trimmed
        .rsplit('/')
        .next()
        .unwrap_or(trimmed)
        .to_string()
}

/// Everything but the last element
pub(crate) fn dir_name(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        None if path.starts_with('/') => "/".into(),
        None => ".".into(),
        Some(0) => "/".into(),
        Some(i) => trimmed[..i].trim_end_matches('/').to_string(),
    }
}

/// Extension of the last element, without the dot
pub(crate) fn ext_name(path: &str) -> String {
    let base = base_name(path);
    match base.rfind('.') {
        Some(i) if i + 1 < base.len() => base[i + 1..].to_string(),
        _ => String::new(),
    }
}
