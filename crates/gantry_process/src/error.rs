//! Error types for process dispatch

use gantry_fs::FsError;
use gantry_runtime::ScriptError;
use gantry_value::ValueError;

/// Classification shared by every process failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ArgumentShape,
    NotFound,
    PermissionDenied,
    DirectoryNotEmpty,
    Io,
    Bridge,
    ScriptExecution,
    Timeout,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// No handler is registered under the name
    #[error("process \"{0}\" is not registered")]
    NotFound(String),
    /// Arguments of the wrong shape, or host data with no value representation
    #[error("invalid arguments for {process}: {message}")]
    Argument { process: String, message: String },
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    /// Any other failure reported by a native handler
    #[error("{0}")]
    Native(String),
}

impl ProcessError {
    pub fn argument(process: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Argument {
            process: process.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Argument { .. } => ErrorKind::ArgumentShape,
            Self::Fs(e) => match e {
                FsError::NotFound(_) | FsError::NoBackend(_) => ErrorKind::NotFound,
                FsError::PermissionDenied(_) => ErrorKind::PermissionDenied,
                FsError::DirectoryNotEmpty(_) => ErrorKind::DirectoryNotEmpty,
                FsError::Argument { .. } | FsError::UnknownMethod(_) => ErrorKind::ArgumentShape,
                FsError::Io { .. } | FsError::InvalidRoot { .. } => ErrorKind::Io,
            },
            Self::Script(e) => match e {
                ScriptError::Bridge(_) => ErrorKind::Bridge,
                ScriptError::Timeout(_) => ErrorKind::Timeout,
                ScriptError::Execution(_) | ScriptError::Internal(_) => ErrorKind::ScriptExecution,
            },
            Self::Native(_) => ErrorKind::Io,
        }
    }

    /// Argument error for a value conversion that failed while building `process`
    pub(crate) fn from_value_error(process: &str, index: usize, err: &ValueError) -> Self {
        Self::argument(process, format!("argument {index}: {err}"))
    }
}
