use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use gantry_value::Value;
use walkdir::WalkDir;

use crate::backends::{Backends, backends};
use crate::error::FsError;
use crate::path::{self, Jail};

/// Default permission bits for files created through the FS object
pub const DEFAULT_FILE_MODE: u32 = 0o644;
/// Default permission bits for directories created through the FS object
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Method names understood by [`FsObject::call`]
pub const METHODS: &[&str] = &[
    "ReadFile",
    "ReadFileBuffer",
    "WriteFile",
    "WriteFileBuffer",
    "Exists",
    "IsDir",
    "IsFile",
    "Remove",
    "RemoveAll",
    "Mkdir",
    "MkdirAll",
    "MkdirTemp",
    "ReadDir",
    "BaseName",
    "DirName",
    "ExtName",
    "Size",
    "ModTime",
    "Mode",
    "Chmod",
    "MimeType",
];

const SNIFF_LEN: u64 = 512;

/// Filesystem operations scoped to one named backend
///
/// Only the backend *name* is stored; the root is looked up again on every call,
/// so re-registering a backend takes effect for existing objects.
#[derive(Clone)]
pub struct FsObject {
    backend: String,
    backends: Backends,
}

impl FsObject {
    /// FS object over the process-wide registry
    pub fn new(backend: impl Into<String>) -> Self {
        Self::with_backends(backend, backends().clone())
    }

    pub fn with_backends(backend: impl Into<String>, backends: Backends) -> Self {
        Self {
            backend: backend.into(),
            backends,
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Invoke a method by name with positional arguments
    ///
    /// # Errors
    ///
    /// Returns [`FsError::UnknownMethod`] for names outside [`METHODS`],
    /// [`FsError::Argument`] when an argument has the wrong shape, and whatever the
    /// method itself fails with.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value, FsError> {
        let args = ArgList { method, args };
        log::trace!(
            "FS({}).{method} called with {} args",
            self.backend,
            args.args.len()
        );

        match method {
            "ReadFile" => self.read_file(args.str(0, "path")?).map(Value::from),
            "ReadFileBuffer" => self.read_file_buffer(args.str(0, "path")?).map(Value::Bytes),
            "WriteFile" | "WriteFileBuffer" => {
                let data = if method == "WriteFile" {
                    args.str(1, "data")?.as_bytes()
                } else {
                    args.bytes(1, "data")?
                };
                let mode = args.mode(2, DEFAULT_FILE_MODE)?;
                self.write_file(args.str(0, "path")?, data, mode)
                    .map(Value::from)
            }
            "Exists" => self.exists(args.str(0, "path")?).map(Value::from),
            "IsDir" => self.is_dir(args.str(0, "path")?).map(Value::from),
            "IsFile" => self.is_file(args.str(0, "path")?).map(Value::from),
            "Remove" => self.remove(args.str(0, "path")?).map(|()| Value::Null),
            "RemoveAll" => self.remove_all(args.str(0, "path")?).map(|()| Value::Null),
            "Mkdir" => self
                .mkdir(args.str(0, "path")?, args.mode(1, DEFAULT_DIR_MODE)?)
                .map(|()| Value::Null),
            "MkdirAll" => self
                .mkdir_all(args.str(0, "path")?, args.mode(1, DEFAULT_DIR_MODE)?)
                .map(|()| Value::Null),
            "MkdirTemp" => self
                .mkdir_temp(args.opt_str(0, "dir")?, args.opt_str(1, "pattern")?)
                .map(Value::from),
            "ReadDir" => self
                .read_dir(args.str(0, "path")?, args.flag(1, "recursive")?)
                .map(|entries| entries.into_iter().map(Value::from).collect()),
            "BaseName" => Ok(path::base_name(args.str(0, "path")?).into()),
            "DirName" => Ok(path::dir_name(args.str(0, "path")?).into()),
            "ExtName" => Ok(path::ext_name(args.str(0, "path")?).into()),
            "Size" => self.size(args.str(0, "path")?).map(Value::from),
            "ModTime" => self.mod_time(args.str(0, "path")?).map(Value::from),
            "Mode" => self.mode(args.str(0, "path")?).map(Value::from),
            "Chmod" => {
                let mode = args.mode(1, DEFAULT_FILE_MODE)?;
                self.chmod(args.str(0, "path")?, mode).map(|()| Value::Null)
            }
            "MimeType" => self.mime_type(args.str(0, "path")?).map(Value::from),
            other => Err(FsError::UnknownMethod(other.to_string())),
        }
    }

    fn jail(&self) -> Result<Jail, FsError> {
        self.backends.resolve(&self.backend).map(Jail::new)
    }

    fn locate(&self, virtual_path: &str) -> Result<(Jail, PathBuf), FsError> {
        let jail = self.jail()?;
        let real = jail.resolve(virtual_path)?;
        Ok((jail, real))
    }

    fn host_path(&self, virtual_path: &str) -> Result<PathBuf, FsError> {
        self.locate(virtual_path).map(|(_, real)| real)
    }

    /// # Errors
    ///
    /// [`FsError::NotFound`] when the file does not exist
    pub fn read_file(&self, path: &str) -> Result<String, FsError> {
        fs::read_to_string(self.host_path(path)?).map_err(|e| FsError::from_io(path, e))
    }

    /// # Errors
    ///
    /// [`FsError::NotFound`] when the file does not exist
    pub fn read_file_buffer(&self, path: &str) -> Result<Vec<u8>, FsError> {
        fs::read(self.host_path(path)?).map_err(|e| FsError::from_io(path, e))
    }

    /// Create or truncate a file, creating missing parents. Returns the bytes written.
    ///
    /// # Errors
    ///
    /// Fails when the file or its parents cannot be written
    pub fn write_file(&self, path: &str, data: &[u8], mode: u32) -> Result<usize, FsError> {
        let real = self.host_path(path)?;
        if let Some(parent) = real.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::from_io(path, e))?;
        }
        fs::write(&real, data).map_err(|e| FsError::from_io(path, e))?;
        set_mode(&real, mode).map_err(|e| FsError::from_io(path, e))?;
        Ok(data.len())
    }

    /// # Errors
    ///
    /// Only path confinement errors; a missing path is simply `false`
    pub fn exists(&self, path: &str) -> Result<bool, FsError> {
        Ok(self.host_path(path)?.exists())
    }

    /// # Errors
    ///
    /// Only path confinement errors
    pub fn is_dir(&self, path: &str) -> Result<bool, FsError> {
        Ok(self.host_path(path)?.is_dir())
    }

    /// # Errors
    ///
    /// Only path confinement errors
    pub fn is_file(&self, path: &str) -> Result<bool, FsError> {
        Ok(self.host_path(path)?.is_file())
    }

    /// Remove a file or an empty directory; a missing path is not an error
    ///
    /// # Errors
    ///
    /// [`FsError::DirectoryNotEmpty`] for a directory that still has entries
    pub fn remove(&self, path: &str) -> Result<(), FsError> {
        let real = self.jail()?.resolve_entry(path)?;
        let Ok(meta) = fs::symlink_metadata(&real) else {
            return Ok(());
        };

        if meta.file_type().is_symlink() {
            remove_link(&real).map_err(|e| FsError::from_io(path, e))
        } else if meta.is_dir() {
            let mut entries = fs::read_dir(&real).map_err(|e| FsError::from_io(path, e))?;
            if entries.next().is_some() {
                return Err(FsError::DirectoryNotEmpty(path.to_string()));
            }
            fs::remove_dir(&real).map_err(|e| FsError::from_io(path, e))
        } else {
            fs::remove_file(&real).map_err(|e| FsError::from_io(path, e))
        }
    }

    /// Remove a path and everything below it; a missing path is not an error
    ///
    /// # Errors
    ///
    /// Fails when an entry cannot be removed
    pub fn remove_all(&self, path: &str) -> Result<(), FsError> {
        let jail = self.jail()?;
        let real = jail.resolve_entry(path)?;
        if real == jail.root() {
            return Err(FsError::PermissionDenied(path.to_string()));
        }
        let Ok(meta) = fs::symlink_metadata(&real) else {
            return Ok(());
        };

        let removed = if meta.file_type().is_symlink() {
            remove_link(&real)
        } else if meta.is_dir() {
            fs::remove_dir_all(&real)
        } else {
            fs::remove_file(&real)
        };
        removed.map_err(|e| FsError::from_io(path, e))
    }

    /// # Errors
    ///
    /// Fails when the parent is missing or the directory already exists
    pub fn mkdir(&self, path: &str, mode: u32) -> Result<(), FsError> {
        create_dir(&self.host_path(path)?, mode, false).map_err(|e| FsError::from_io(path, e))
    }

    /// # Errors
    ///
    /// Fails when a component exists as a file or cannot be created
    pub fn mkdir_all(&self, path: &str, mode: u32) -> Result<(), FsError> {
        create_dir(&self.host_path(path)?, mode, true).map_err(|e| FsError::from_io(path, e))
    }

    /// Create a uniquely named directory and return its virtual path
    ///
    /// `dir` defaults to the backend root and `pattern` to `*`. The last `*` in the
    /// pattern is replaced by a random component, which is appended when the
    /// pattern has none.
    ///
    /// # Errors
    ///
    /// Fails when `dir` does not exist or no unique name could be created
    pub fn mkdir_temp(&self, dir: Option<&str>, pattern: Option<&str>) -> Result<String, FsError> {
        let dir = dir.unwrap_or("/");
        let pattern = pattern.unwrap_or("*");
        if pattern.contains(['/', '\\']) {
            return Err(FsError::Argument {
                method: "MkdirTemp",
                message: format!("pattern \"{pattern}\" contains a path separator"),
            });
        }

        let (jail, base) = self.locate(dir)?;
        let mut last_err = None;
        for _ in 0..16 {
            let candidate = base.join(temp_name(pattern));
            match fs::create_dir(&candidate) {
                Ok(()) => {
                    set_mode(&candidate, 0o700).map_err(|e| FsError::from_io(dir, e))?;
                    return Ok(jail.to_virtual(&candidate));
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => last_err = Some(e),
                Err(e) => return Err(FsError::from_io(dir, e)),
            }
        }
        Err(FsError::from_io(
            dir,
            last_err.unwrap_or_else(|| std::io::Error::other("no unique name available")),
        ))
    }

    /// Sorted virtual paths of a directory's entries
    ///
    /// A recursive listing starts with the directory itself and includes every
    /// nested directory and file.
    ///
    /// # Errors
    ///
    /// [`FsError::NotFound`] when the directory does not exist
    pub fn read_dir(&self, path: &str, recursive: bool) -> Result<Vec<String>, FsError> {
        let (jail, real) = self.locate(path)?;
        let meta = fs::metadata(&real).map_err(|e| FsError::from_io(path, e))?;
        if !meta.is_dir() {
            return Err(FsError::from_io(
                path,
                std::io::ErrorKind::NotADirectory.into(),
            ));
        }

        let walker = WalkDir::new(&real).follow_links(false);
        let walker = if recursive {
            walker
        } else {
            walker.min_depth(1).max_depth(1)
        };

        let mut entries = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| walk_error(path, e))?;
            entries.push(jail.to_virtual(entry.path()));
        }
        entries.sort();
        Ok(entries)
    }

    /// # Errors
    ///
    /// [`FsError::NotFound`] when the path does not exist
    pub fn size(&self, path: &str) -> Result<u64, FsError> {
        Ok(self.metadata(path)?.len())
    }

    /// Modification time in seconds since the unix epoch
    ///
    /// # Errors
    ///
    /// [`FsError::NotFound`] when the path does not exist
    pub fn mod_time(&self, path: &str) -> Result<u64, FsError> {
        let modified = self
            .metadata(path)?
            .modified()
            .map_err(|e| FsError::from_io(path, e))?;
        Ok(modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default())
    }

    /// Permission bits
    ///
    /// # Errors
    ///
    /// [`FsError::NotFound`] when the path does not exist
    pub fn mode(&self, path: &str) -> Result<u32, FsError> {
        Ok(permission_bits(&self.metadata(path)?))
    }

    /// # Errors
    ///
    /// [`FsError::NotFound`] when the path does not exist
    pub fn chmod(&self, path: &str, mode: u32) -> Result<(), FsError> {
        let real = self.host_path(path)?;
        if !real.exists() {
            return Err(FsError::NotFound(path.to_string()));
        }
        set_mode(&real, mode).map_err(|e| FsError::from_io(path, e))
    }

    /// Content type from the file's leading bytes, falling back to its extension
    ///
    /// # Errors
    ///
    /// [`FsError::NotFound`] when the file does not exist
    pub fn mime_type(&self, path: &str) -> Result<String, FsError> {
        let real = self.host_path(path)?;
        let mut head = Vec::new();
        fs::File::open(&real)
            .and_then(|f| f.take(SNIFF_LEN).read_to_end(&mut head))
            .map_err(|e| FsError::from_io(path, e))?;
        Ok(sniff_mime(&real, &head))
    }

    fn metadata(&self, path: &str) -> Result<fs::Metadata, FsError> {
        fs::metadata(self.host_path(path)?).map_err(|e| FsError::from_io(path, e))
    }
}

/// Detect a content type from leading bytes, then from the extension
pub fn sniff_mime(path: &Path, head: &[u8]) -> String {
    if let Some(kind) = infer::get(head) {
        return kind.mime_type().to_string();
    }
    if looks_like_text(head) {
        return "text/plain; charset=utf-8".to_string();
    }
    mime_guess::from_path(path).first().map_or_else(
        || "application/octet-stream".to_string(),
        |m| m.essence_str().to_string(),
    )
}

fn looks_like_text(head: &[u8]) -> bool {
    match std::str::from_utf8(head) {
        Ok(text) => !text.contains('\0'),
        // a multi-byte character cut at the sniff boundary
        Err(e) => e.error_len().is_none() && head.len() as u64 == SNIFF_LEN,
    }
}

fn walk_error(path: &str, err: walkdir::Error) -> FsError {
    let detail = err.to_string();
    match err.into_io_error() {
        Some(io) => FsError::from_io(path, io),
        None => FsError::Io {
            path: path.to_string(),
            source: std::io::Error::other(detail),
        },
    }
}

// Directory links need remove_dir on windows
fn remove_link(path: &Path) -> std::io::Result<()> {
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

fn temp_name(pattern: &str) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    let random = &random[..12];
    match pattern.rfind('*') {
        Some(i) => format!("{}{random}{}", &pattern[..i], &pattern[i + 1..]),
        None => format!("{pattern}{random}"),
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(mode & 0o222 == 0);
    fs::set_permissions(path, perms)
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() { 0o444 } else { 0o666 }
}

#[cfg(unix)]
fn create_dir(path: &Path, mode: u32, recursive: bool) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(recursive)
        .mode(mode)
        .create(path)
}

#[cfg(not(unix))]
fn create_dir(path: &Path, _mode: u32, recursive: bool) -> std::io::Result<()> {
    fs::DirBuilder::new().recursive(recursive).create(path)
}

/// Positional argument access with method-specific error messages
struct ArgList<'a> {
    method: &'a str,
    args: &'a [Value],
}

impl<'a> ArgList<'a> {
    fn error(&self, message: String) -> FsError {
        FsError::Argument {
            method: METHODS
                .iter()
                .find(|m| **m == self.method)
                .copied()
                .unwrap_or("call"),
            message,
        }
    }

    fn get(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index).filter(|v| !v.is_null())
    }

    fn str(&self, index: usize, name: &str) -> Result<&'a str, FsError> {
        match self.get(index) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(self.error(format!(
                "{name} must be a string, got {}",
                other.type_name()
            ))),
            None => Err(self.error(format!("{name} is required"))),
        }
    }

    fn opt_str(&self, index: usize, name: &str) -> Result<Option<&'a str>, FsError> {
        match self.get(index) {
            None => Ok(None),
            Some(_) => self.str(index, name).map(Some),
        }
    }

    fn bytes(&self, index: usize, name: &str) -> Result<&'a [u8], FsError> {
        match self.get(index) {
            Some(Value::Bytes(b)) => Ok(b),
            Some(Value::String(s)) => Ok(s.as_bytes()),
            Some(other) => Err(self.error(format!(
                "{name} must be a byte buffer, got {}",
                other.type_name()
            ))),
            None => Err(self.error(format!("{name} is required"))),
        }
    }

    fn mode(&self, index: usize, default: u32) -> Result<u32, FsError> {
        match self.get(index) {
            None => Ok(default),
            Some(v) => v
                .as_i64()
                .and_then(|m| u32::try_from(m).ok())
                .filter(|m| *m <= 0o7777)
                .ok_or_else(|| {
                    self.error(format!(
                        "mode must be a permission number, got {}",
                        v.type_name()
                    ))
                }),
        }
    }

    fn flag(&self, index: usize, name: &str) -> Result<bool, FsError> {
        match self.get(index) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(self.error(format!(
                "{name} must be a boolean, got {}",
                other.type_name()
            ))),
        }
    }
}
