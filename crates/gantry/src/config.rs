use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use gantry_runtime::Bindings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub scripts: ScriptsConfig,
    /// Filesystem backends: name to root directory
    #[serde(default)]
    pub backends: BTreeMap<String, PathBuf>,
    /// Where script sources are loaded from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processes: Vec<ScriptProcessConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct HttpConfig {
    pub timeout_secs: u64,
    /// Backend that file payloads and attachments are read from
    pub file_backend: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: gantry_http::DEFAULT_HTTP_TIMEOUT.as_secs(),
            file_backend: "system".to_string(),
        }
    }
}

impl HttpConfig {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ScriptsConfig {
    pub workers: usize,
    pub timeout_secs: u64,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            timeout_secs: gantry_runtime::DEFAULT_SCRIPT_TIMEOUT.as_secs(),
        }
    }
}

impl ScriptsConfig {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub(crate) enum SourceConfig {
    Local {
        root: PathBuf,
    },
    Github {
        /// `github.com/owner/repo` or `owner/repo`
        repo: String,
        /// Literal token, `${VAR_NAME}` or `command://...`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        /// API base URL, for GitHub Enterprise
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_url: Option<String>,
    },
}

/// A script function exposed as a process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScriptProcessConfig {
    /// Process name, e.g. `scripts.report.Build`
    pub name: String,
    /// Script path within the content source
    pub script: String,
    pub function: String,
    /// Capabilities visible to the script, e.g. `{ FS = "fs" }`
    #[serde(default)]
    pub bindings: Bindings,
}

impl Config {
    /// Load from `path`, or from the default location when `None`
    ///
    /// A missing file at the default location yields the default configuration;
    /// an explicitly given path must exist.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::config_path()?, false),
        };

        if !explicit && !config_path.exists() {
            log::debug!(
                "No configuration at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
        Ok(config.relative_to(config_path.parent().unwrap_or(Path::new("."))))
    }

    pub(crate) fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to determine home directory")?;

        Ok(home.join(".gantry").join("config.toml"))
    }

    fn validate(&self) -> Result<()> {
        if self.scripts.workers == 0 {
            anyhow::bail!("scripts.workers must be at least 1");
        }
        if !self.processes.is_empty() && self.source.is_none() {
            anyhow::bail!("script processes are configured but no [source] is set");
        }
        let mut seen = std::collections::HashSet::new();
        for process in &self.processes {
            if !seen.insert(process.name.as_str()) {
                anyhow::bail!("Process '{}' is configured twice", process.name);
            }
        }
        Ok(())
    }

    /// Resolve relative backend and source roots against the config file's directory
    fn relative_to(mut self, base: &Path) -> Self {
        for root in self.backends.values_mut() {
            if root.is_relative() {
                *root = base.join(&*root);
            }
        }
        if let Some(SourceConfig::Local { root }) = &mut self.source
            && root.is_relative()
        {
            *root = base.join(&*root);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_runtime::Capability;

    const FULL: &str = r#"
        [http]
        timeout_secs = 5
        file_backend = "data"

        [scripts]
        workers = 3

        [backends]
        data = "/srv/data"
        uploads = "uploads"

        [source]
        kind = "github"
        repo = "github.com/acme/scripts"
        token = "${GANTRY_TOKEN}"

        [[processes]]
        name = "scripts.report.Build"
        script = "/report.js"
        function = "Build"
        bindings = { FS = "fs" }
    "#;

    #[test]
    fn parses_every_section() {
        let config = Config::from_toml(FULL).unwrap();
        assert_eq!(config.http.timeout(), Duration::from_secs(5));
        assert_eq!(config.http.file_backend, "data");
        assert_eq!(config.scripts.workers, 3);
        assert_eq!(config.scripts.timeout(), gantry_runtime::DEFAULT_SCRIPT_TIMEOUT);
        assert_eq!(config.backends["data"], PathBuf::from("/srv/data"));
        assert!(matches!(
            config.source,
            Some(SourceConfig::Github { ref token, .. }) if token.as_deref() == Some("${GANTRY_TOKEN}")
        ));
        assert_eq!(
            config.processes[0].bindings,
            Bindings::new().with("FS", Capability::Fs)
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.http.file_backend, "system");
    }

    #[test]
    fn rejects_invalid_configs() {
        assert!(Config::from_toml("[scripts]\nworkers = 0").is_err());
        assert!(Config::from_toml("unknown = 1").is_err());
        let without_source = r#"
            [[processes]]
            name = "a"
            script = "a.js"
            function = "A"
        "#;
        assert!(Config::from_toml(without_source).is_err());
    }

    #[test]
    fn relative_roots_follow_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[backends]\nuploads = \"uploads\"\n[source]\nkind = \"local\"\nroot = \"scripts\"").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.backends["uploads"], dir.path().join("uploads"));
        assert_eq!(
            config.source,
            Some(SourceConfig::Local {
                root: dir.path().join("scripts")
            })
        );
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
