use std::collections::BTreeMap;

use deno_core::{JsRuntime, PollEventLoopOptions, RuntimeOptions, v8};
use gantry_fs::Backends;
use gantry_value::Value;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScriptError;
use crate::ops::{PendingArgs, ScriptOutcome};
use crate::{RUNTIME_SNAPSHOT, gantry_script};

const BOOTSTRAP: &str = "globalThis[Symbol.for(\"gantry.bootstrap\")]";

/// Host resource that can be exposed to scripts under a global name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// The `FS` filesystem object
    #[serde(alias = "FS")]
    Fs,
}

/// Global names a context exposes, and what each one is bound to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings(BTreeMap<String, Capability>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert)
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, capability: Capability) -> Self {
        self.insert(name, capability);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, capability: Capability) {
        self.0.insert(name.into(), capability);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Capability)> {
        self.0.iter().map(|(name, cap)| (name.as_str(), *cap))
    }
}

/// One embedded engine instance
///
/// A session owns a V8 isolate and must stay on the thread that created it. It is
/// released by [`dispose`](Self::dispose) or when dropped.
pub struct Session {
    runtime: JsRuntime,
    entry: String,
    token: String,
}

impl Session {
    /// Start an engine from the runtime snapshot; FS objects resolve against `backends`
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Internal`] if the runtime cannot be locked down
    pub fn new(backends: Backends) -> Result<Self, ScriptError> {
        let mut runtime = JsRuntime::new(RuntimeOptions {
            startup_snapshot: Some(RUNTIME_SNAPSHOT),
            extensions: vec![gantry_script::init(backends)],
            ..Default::default()
        });

        // Scripts can list global names, so the entry name is not the secret
        let entry = format!("__gantry_{}", Uuid::new_v4().simple());
        let token = Uuid::new_v4().simple().to_string();
        runtime
            .execute_script(
                "<gantry:bootstrap>",
                format!("{BOOTSTRAP}(\"{entry}\", \"{token}\")"),
            )
            .map_err(|e| ScriptError::Internal(format!("cannot bootstrap script runtime: {e}")))?;

        log::debug!("Started script session");
        Ok(Self {
            runtime,
            entry,
            token,
        })
    }

    /// Host-side call into the protocol entry point
    fn protocol(&self, action: &str, payload: &str) -> String {
        format!(
            "{}(\"{}\", \"{action}\", {payload})",
            self.entry, self.token
        )
    }

    /// Open a context exposing `bindings` as globals
    ///
    /// Only one context can be open at a time. When the returned [`Context`] is
    /// dropped the global object is put back as it was: names the context defined
    /// are removed and overwritten globals, bindings included, are restored.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Execution`] if the bindings cannot be installed
    pub fn new_context(&mut self, bindings: &Bindings) -> Result<Context<'_>, ScriptError> {
        let encoded = serde_json::to_string(bindings)
            .map_err(|e| ScriptError::Internal(e.to_string()))?;
        let install = self.protocol("install", &encoded);
        self.runtime
            .execute_script("<gantry:install>", install)
            .map_err(|e| ScriptError::Execution(e.to_string()))?;
        Ok(Context { session: self })
    }

    /// Handle that can interrupt this session from another thread
    pub fn isolate_handle(&mut self) -> v8::IsolateHandle {
        self.runtime.v8_isolate().thread_safe_handle()
    }

    /// Release the engine
    pub fn dispose(self) {
        drop(self);
    }

    async fn evaluate(&mut self, code: String) -> Result<Value, ScriptError> {
        let state = self.runtime.op_state();
        state.borrow_mut().try_take::<ScriptOutcome>();

        let promise = self
            .runtime
            .execute_script("<gantry:script>", code)
            .map_err(|e| ScriptError::Execution(e.to_string()))?;
        let resolve = self.runtime.resolve(promise);
        self.runtime
            .with_event_loop_promise(resolve, PollEventLoopOptions::default())
            .await
            .map_err(|e| ScriptError::Execution(e.to_string()))?;

        let outcome = state.borrow_mut().try_take::<ScriptOutcome>();
        match outcome {
            Some(ScriptOutcome(result)) => result,
            None => Err(ScriptError::Internal(
                "script finished without delivering a result".into(),
            )),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        log::debug!("Disposed script session");
    }
}

/// A session's global scope with a set of bindings installed
pub struct Context<'s> {
    session: &'s mut Session,
}

impl Context<'_> {
    /// Evaluate a classic script and return its completion value
    ///
    /// A promise completion value is awaited. Top-level function declarations stay
    /// defined for later [`call`](Self::call)s.
    ///
    /// # Errors
    ///
    /// [`ScriptError::Execution`] for exceptions, [`ScriptError::Bridge`] for a
    /// completion value the host cannot represent
    pub async fn run(&mut self, source: &str) -> Result<Value, ScriptError> {
        let source =
            serde_json::to_string(source).map_err(|e| ScriptError::Internal(e.to_string()))?;
        let run = self.session.protocol("run", &source);
        self.session.evaluate(run).await
    }

    /// Call a global function with host arguments
    ///
    /// # Errors
    ///
    /// [`ScriptError::Execution`] when `function` is not defined or throws,
    /// [`ScriptError::Bridge`] for a return value the host cannot represent
    pub async fn call(&mut self, function: &str, args: Vec<Value>) -> Result<Value, ScriptError> {
        let name =
            serde_json::to_string(function).map_err(|e| ScriptError::Internal(e.to_string()))?;
        self.session
            .runtime
            .op_state()
            .borrow_mut()
            .put(PendingArgs(args));
        let call = self.session.protocol("call", &name);
        self.session.evaluate(call).await
    }
}

impl Drop for Context<'_> {
    fn drop(&mut self) {
        let uninstall = self.session.protocol("uninstall", "null");
        let restored = self
            .session
            .runtime
            .execute_script("<gantry:uninstall>", uninstall);
        if let Err(e) = restored {
            log::warn!("Failed to restore the global scope: {e}");
        }
    }
}
