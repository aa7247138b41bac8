use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use gantry_runtime::Bindings;
use gantry_value::Value;

use crate::error::ProcessError;

/// Future returned by native handlers
pub type NativeFuture = BoxFuture<'static, Result<Value, ProcessError>>;

/// Host function invoked with the positional arguments of a process
pub type NativeFn = Arc<dyn Fn(Vec<Value>) -> NativeFuture + Send + Sync>;

/// Turns a rejected argument list into the handler's own result shape
pub type ArgumentFallback = Arc<dyn Fn(ProcessError) -> Value + Send + Sync>;

/// A host function plus an optional [`ArgumentFallback`]
///
/// Without a fallback, arguments that failed to convert are reported to the
/// caller as [`ProcessError::Argument`].
#[derive(Clone)]
pub struct NativeHandler {
    pub(crate) call: NativeFn,
    pub(crate) fallback: Option<ArgumentFallback>,
}

/// Script source plus the capabilities it runs with
#[derive(Debug, Clone)]
pub struct Script {
    pub name: String,
    pub source: Arc<str>,
    pub bindings: Bindings,
}

impl Script {
    pub fn new(name: impl Into<String>, source: impl Into<Arc<str>>, bindings: Bindings) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            bindings,
        }
    }
}

/// A function defined in a [`Script`]
#[derive(Debug, Clone)]
pub struct ScriptHandler {
    pub script: Arc<Script>,
    pub function: String,
}

/// What a process name resolves to
#[derive(Clone)]
pub enum Handler {
    Native(NativeHandler),
    Script(ScriptHandler),
}

impl Handler {
    /// Wrap an async closure as a native handler
    pub fn native<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ProcessError>> + Send + 'static,
    {
        Self::Native(NativeHandler {
            call: Arc::new(move |args| Box::pin(f(args))),
            fallback: None,
        })
    }

    /// Answer argument conversion failures with `fallback` instead of an error
    ///
    /// Has no effect on script handlers.
    #[must_use]
    pub fn with_argument_fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn(ProcessError) -> Value + Send + Sync + 'static,
    {
        if let Self::Native(native) = &mut self {
            native.fallback = Some(Arc::new(fallback));
        }
        self
    }

    pub fn script(script: Arc<Script>, function: impl Into<String>) -> Self {
        Self::Script(ScriptHandler {
            script,
            function: function.into(),
        })
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(native) => f
                .debug_struct("Handler::Native")
                .field("fallback", &native.fallback.is_some())
                .finish(),
            Self::Script(handler) => f
                .debug_struct("Handler::Script")
                .field("script", &handler.script.name)
                .field("function", &handler.function)
                .finish(),
        }
    }
}
