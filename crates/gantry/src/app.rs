use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use gantry_fs::{Backends, FsObject, METHODS};
use gantry_http::HttpOptions;
use gantry_process::{Dispatcher, Handler, ProcessError, ProcessRegistry, Script};
use gantry_runtime::{PoolOptions, ScriptPool};
use gantry_value::Value;

use crate::config::Config;
use crate::source::{self, ContentSource};

/// Everything a configuration brings up, ready to dispatch
pub(crate) struct App {
    dispatcher: Dispatcher,
    backends: Backends,
}

impl App {
    /// Bring up the app on the process-wide backend and process registries
    pub(crate) async fn bootstrap(config: &Config) -> Result<Self> {
        Self::bootstrap_with(
            config,
            gantry_fs::backends().clone(),
            gantry_process::registry().clone(),
        )
        .await
    }

    pub(crate) async fn bootstrap_with(
        config: &Config,
        backends: Backends,
        registry: ProcessRegistry,
    ) -> Result<Self> {
        for (name, root) in &config.backends {
            backends
                .register(name, root)
                .with_context(|| format!("Failed to register backend '{name}'"))?;
            register_fs_processes(&registry, &backends, name);
        }

        gantry_http::register(
            &registry,
            &HttpOptions {
                timeout: config.http.timeout(),
                file_backend: config.http.file_backend.clone(),
                backends: backends.clone(),
            },
        )?;

        if let Some(source_config) = &config.source {
            let source = source::open(source_config).await?;
            register_scripts(&registry, source.as_ref(), config).await?;
        }

        let pool = ScriptPool::new(PoolOptions {
            workers: config.scripts.workers,
            timeout: config.scripts.timeout(),
            backends: backends.clone(),
        })?;

        log::debug!(
            "Bootstrapped {} processes over {} backends",
            registry.names().len(),
            backends.names().len()
        );
        Ok(Self {
            dispatcher: Dispatcher::new(registry, pool),
            backends,
        })
    }

    pub(crate) async fn run(&self, name: &str, args: Vec<Value>) -> Result<Value, ProcessError> {
        self.dispatcher.dispatch(name, args).await
    }

    pub(crate) fn process_names(&self) -> Vec<String> {
        self.dispatcher.registry().names()
    }

    pub(crate) fn backend_names(&self) -> Vec<String> {
        self.backends.names()
    }
}

/// Register `fs.<backend>.<Method>` for every FS method
fn register_fs_processes(registry: &ProcessRegistry, backends: &Backends, backend: &str) {
    for method in METHODS {
        let files = FsObject::with_backends(backend, backends.clone());
        let handler = Handler::native(move |args| {
            let files = files.clone();
            async move {
                tokio::task::spawn_blocking(move || files.call(method, &args))
                    .await
                    .map_err(|e| ProcessError::Native(format!("FS.{method} did not finish: {e}")))?
                    .map_err(ProcessError::from)
            }
        });
        registry.register(format!("fs.{backend}.{method}"), handler);
    }
}

/// Load every configured script and register its processes
///
/// A script file used by several processes is loaded once.
async fn register_scripts(
    registry: &ProcessRegistry,
    source: &dyn ContentSource,
    config: &Config,
) -> Result<()> {
    let mut loaded: HashMap<(&str, String), Arc<Script>> = HashMap::new();

    for process in &config.processes {
        let key = (process.script.as_str(), bindings_key(process));
        let script = match loaded.get(&key) {
            Some(script) => Arc::clone(script),
            None => {
                let bytes = source
                    .content(&process.script)
                    .await
                    .with_context(|| format!("Failed to load script {}", process.script))?;
                let text = String::from_utf8(bytes)
                    .with_context(|| format!("Script {} is not valid UTF-8", process.script))?;
                let script = Arc::new(Script::new(
                    process.script.clone(),
                    text,
                    process.bindings.clone(),
                ));
                loaded.insert(key, Arc::clone(&script));
                script
            }
        };
        registry.register(
            process.name.clone(),
            Handler::script(script, process.function.clone()),
        );
    }
    Ok(())
}

fn bindings_key(process: &crate::config::ScriptProcessConfig) -> String {
    process
        .bindings
        .iter()
        .map(|(name, capability)| format!("{name}={capability:?}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ScriptProcessConfig, SourceConfig};
    use gantry_process::ErrorKind;
    use gantry_runtime::{Bindings, Capability};

    struct Fixture {
        data: tempfile::TempDir,
        scripts: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let scripts = tempfile::tempdir().unwrap();
            std::fs::write(
                scripts.path().join("notes.js"),
                r#"
                function Save(name, text) {
                    const fs = new FS("data");
                    return fs.WriteFile(`/notes/${name}.txt`, text);
                }
                function List() {
                    return new FS("data").ReadDir("/notes", false);
                }
                "#,
            )
            .unwrap();
            Self {
                data: tempfile::tempdir().unwrap(),
                scripts,
            }
        }

        fn config(&self) -> Config {
            let bindings = Bindings::new().with("FS", Capability::Fs);
            let process = |name: &str, function: &str| ScriptProcessConfig {
                name: name.to_string(),
                script: "/notes.js".to_string(),
                function: function.to_string(),
                bindings: bindings.clone(),
            };
            let mut config = Config::default();
            config.scripts.workers = 1;
            config.http.file_backend = "data".to_string();
            config.backends.insert("data".into(), self.data.path().to_path_buf());
            config.source = Some(SourceConfig::Local {
                root: self.scripts.path().to_path_buf(),
            });
            config.processes = vec![
                process("scripts.notes.Save", "Save"),
                process("scripts.notes.List", "List"),
            ];
            config
        }

        async fn app(&self) -> App {
            App::bootstrap_with(&self.config(), Backends::new(), ProcessRegistry::new())
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn registers_every_family() {
        let fx = Fixture::new();
        let app = fx.app().await;

        let names = app.process_names();
        assert!(names.contains(&"http.Get".to_string()));
        assert!(names.contains(&"fs.data.ReadFile".to_string()));
        assert!(names.contains(&"fs.data.MimeType".to_string()));
        assert!(names.contains(&"scripts.notes.Save".to_string()));
        assert_eq!(app.backend_names(), vec!["data"]);
    }

    #[tokio::test]
    async fn script_and_native_processes_share_backends() {
        let fx = Fixture::new();
        let app = fx.app().await;

        let written = app
            .run("scripts.notes.Save", vec!["todo".into(), "ship it".into()])
            .await
            .unwrap();
        assert_eq!(written, Value::Int(7));

        let text = app
            .run("fs.data.ReadFile", vec!["/notes/todo.txt".into()])
            .await
            .unwrap();
        assert_eq!(text, Value::from("ship it"));

        let listed = app.run("scripts.notes.List", vec![]).await.unwrap();
        assert_eq!(listed, Value::Array(vec![Value::from("/notes/todo.txt")]));
    }

    #[tokio::test]
    async fn native_fs_errors_are_typed() {
        let fx = Fixture::new();
        let app = fx.app().await;

        app.run("fs.data.MkdirAll", vec!["/full/inner".into()]).await.unwrap();
        let err = app.run("fs.data.Remove", vec!["/full".into()]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DirectoryNotEmpty);
        assert!(err.to_string().contains("directory not empty"));

        let err = app.run("fs.data.ReadFile", vec!["/../outside".into()]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        let err = app.run("fs.other.ReadFile", vec!["/a".into()]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn missing_script_fails_bootstrap() {
        let fx = Fixture::new();
        let mut config = fx.config();
        config.processes[0].script = "/absent.js".to_string();

        let err = App::bootstrap_with(&config, Backends::new(), ProcessRegistry::new())
            .await
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("/absent.js"));
    }
}
