//! # Gantry Process
//!
//! Named-process registry and dispatcher.
//!
//! A process is a name such as `http.Get` or `fs.data.ReadFile` bound to a
//! [`Handler`]: either an async host function or a function defined in a script.
//! Callers invoke processes by name with positional [`Value`](gantry_value::Value)
//! arguments through a [`Dispatcher`], which runs script handlers on a
//! [`ScriptPool`](gantry_runtime::ScriptPool).
//!
//! ```rust
//! use gantry_process::{Dispatcher, Handler, Process, ProcessRegistry};
//! use gantry_value::Value;
//!
//! # async fn example() -> Result<(), gantry_process::ProcessError> {
//! let registry = ProcessRegistry::new();
//! registry.register(
//!     "utils.echo",
//!     Handler::native(|args| async move { Ok(Value::Array(args)) }),
//! );
//!
//! let dispatcher = Dispatcher::native_only(registry);
//! let echoed = dispatcher.run(Process::new("utils.echo").arg("hi")).await?;
//! assert_eq!(echoed, Value::Array(vec![Value::from("hi")]));
//! # Ok(())
//! # }
//! ```

mod args;
mod dispatcher;
mod error;
mod handler;
mod process;
mod registry;

pub use args::Args;
pub use dispatcher::Dispatcher;
pub use error::{ErrorKind, ProcessError};
pub use handler::{
    ArgumentFallback, Handler, NativeFn, NativeFuture, NativeHandler, Script, ScriptHandler,
};
pub use process::Process;
pub use registry::{ProcessRegistry, registry};
