use gantry_runtime::{ScriptJob, ScriptPool};
use gantry_value::Value;

use crate::error::ProcessError;
use crate::handler::Handler;
use crate::process::Process;
use crate::registry::ProcessRegistry;

/// Routes process invocations to their handlers
///
/// Native handlers are awaited on the caller's task. Script handlers are sent to
/// the [`ScriptPool`]; dropping the returned future abandons the call and any work
/// already running on a worker finishes with its result discarded.
#[derive(Clone)]
pub struct Dispatcher {
    registry: ProcessRegistry,
    pool: Option<ScriptPool>,
}

impl Dispatcher {
    pub fn new(registry: ProcessRegistry, pool: ScriptPool) -> Self {
        Self {
            registry,
            pool: Some(pool),
        }
    }

    /// Dispatcher without a script pool; script processes fail to run
    pub fn native_only(registry: ProcessRegistry) -> Self {
        Self {
            registry,
            pool: None,
        }
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Invoke the handler registered under `name`
    ///
    /// # Errors
    ///
    /// [`ProcessError::NotFound`] for an unregistered name, otherwise whatever the
    /// handler fails with
    pub async fn dispatch(&self, name: &str, args: Vec<Value>) -> Result<Value, ProcessError> {
        let handler = self
            .registry
            .get(name)
            .ok_or_else(|| ProcessError::NotFound(name.to_string()))?;
        log::debug!("Dispatching {name} with {} arguments", args.len());

        match handler {
            Handler::Native(native) => (native.call)(args).await,
            Handler::Script(handler) => {
                let Some(pool) = &self.pool else {
                    return Err(ProcessError::Native(format!(
                        "{name} is a script process but no script pool is running"
                    )));
                };
                let job = ScriptJob::call(
                    handler.script.source.clone(),
                    handler.script.bindings.clone(),
                    handler.function,
                    args,
                );
                Ok(pool.execute(job).await?)
            }
        }
    }

    /// Dispatch a built [`Process`]
    ///
    /// # Errors
    ///
    /// [`ProcessError::Argument`] when an argument failed to convert, unless the
    /// native handler registered under the name has an argument fallback; in that
    /// case the fallback's value is returned and the handler itself never runs.
    /// Otherwise as [`dispatch`](Self::dispatch).
    pub async fn run(&self, process: Process) -> Result<Value, ProcessError> {
        match process.into_parts() {
            Ok((name, args)) => self.dispatch(&name, args).await,
            Err(err) => self.reject(err),
        }
    }

    fn reject(&self, err: ProcessError) -> Result<Value, ProcessError> {
        let fallback = match &err {
            ProcessError::Argument { process, .. } => match self.registry.get(process) {
                Some(Handler::Native(native)) => native.fallback,
                _ => None,
            },
            _ => None,
        };
        match fallback {
            Some(fallback) => {
                log::debug!("Answering rejected arguments with the handler's fallback: {err}");
                Ok(fallback(err))
            }
            None => Err(err),
        }
    }
}
