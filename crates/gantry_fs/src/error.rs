use std::io;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("no such file or directory: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("filesystem backend \"{0}\" is not registered")]
    NoBackend(String),
    #[error("cannot use \"{root}\" as the root of backend \"{name}\": {reason}")]
    InvalidRoot {
        name: String,
        root: String,
        reason: String,
    },
    #[error("FS.{0} is not a method")]
    UnknownMethod(String),
    #[error("FS.{method}: {message}")]
    Argument {
        method: &'static str,
        message: String,
    },
}

impl FsError {
    /// Classify an io error raised while touching the virtual `path`
    pub(crate) fn from_io(path: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_string()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_string()),
            io::ErrorKind::DirectoryNotEmpty => Self::DirectoryNotEmpty(path.to_string()),
            _ => Self::Io {
                path: path.to_string(),
                source: err,
            },
        }
    }
}
