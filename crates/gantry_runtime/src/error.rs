//! Error types for the script runtime

use std::borrow::Cow;
use std::time::Duration;

use deno_error::{JsErrorClass, PropertyValue};
use gantry_fs::FsError;

/// Failure of a script evaluation, as seen by the host
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// An exception escaped the script; carries the exception's text
    #[error("{0}")]
    Execution(String),
    /// A value had no representation on the other side of the bridge
    #[error("cannot bridge value: {0}")]
    Bridge(String),
    /// The script ran past its execution limit and was terminated
    #[error("script exceeded its execution limit of {0:?}")]
    Timeout(Duration),
    /// The runtime itself failed (worker gone, panic, missing result)
    #[error("script runtime failure: {0}")]
    Internal(String),
}

/// Error raised to scripts by capability ops
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error("cannot bridge value: {0}")]
    Bridge(String),
}

impl From<ScriptError> for CapabilityError {
    fn from(value: ScriptError) -> Self {
        match value {
            ScriptError::Bridge(message) => Self::Bridge(message),
            other => Self::Bridge(other.to_string()),
        }
    }
}

impl CapabilityError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Fs(FsError::NotFound(_)) => "NotFound",
            Self::Fs(FsError::PermissionDenied(_)) => "PermissionDenied",
            Self::Fs(FsError::DirectoryNotEmpty(_)) => "DirectoryNotEmpty",
            Self::Fs(FsError::Argument { .. } | FsError::UnknownMethod(_)) => "ArgumentShape",
            Self::Fs(_) => "Io",
            Self::Bridge(_) => "Bridge",
        }
    }
}

// Scripts see a plain `Error` carrying the host message and a `kind` property
impl JsErrorClass for CapabilityError {
    fn get_class(&self) -> Cow<'static, str> {
        Cow::Borrowed("Error")
    }

    fn get_message(&self) -> Cow<'static, str> {
        Cow::Owned(self.to_string())
    }

    fn get_additional_properties(
        &self,
    ) -> Box<dyn Iterator<Item = (Cow<'static, str>, PropertyValue)>> {
        let kind = PropertyValue::String(Cow::Borrowed(self.kind()));
        Box::new(std::iter::once((Cow::Borrowed("kind"), kind)))
    }

    fn get_ref(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }
}
