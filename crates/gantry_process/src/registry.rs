use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::handler::Handler;

static REGISTRY: LazyLock<ProcessRegistry> = LazyLock::new(ProcessRegistry::new);

/// Process-wide registry
pub fn registry() -> &'static ProcessRegistry {
    &REGISTRY
}

/// Name to handler table
///
/// Cloning yields another handle onto the same table. Lookups may run concurrently;
/// registration is expected to happen during startup.
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    handlers: Arc<RwLock<HashMap<String, Handler>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing and returning any previous one
    pub fn register(&self, name: impl Into<String>, handler: Handler) -> Option<Handler> {
        let name = name.into();
        log::debug!("Registering process {name}");
        let previous = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), handler);
        if previous.is_some() {
            log::debug!("Process {name} replaced an earlier registration");
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Handler> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn remove(&self, name: &str) -> Option<Handler> {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }
}
