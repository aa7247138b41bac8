//! Where script sources come from
//!
//! A [`ContentSource`] serves files by path. Paths are absolute within the source
//! (`/reports/build.js`), whether it is a local directory or a GitHub repository.

mod github;
mod local;
mod token;

use anyhow::Result;
use async_trait::async_trait;

pub(crate) use github::GithubSource;
pub(crate) use local::LocalSource;

use crate::config::SourceConfig;

#[derive(Debug, thiserror::Error)]
pub(crate) enum RepoError {
    /// The path does not exist in the source
    #[error("{0}")]
    NotFound(String),
    /// The remote answered with an unexpected status, e.g. `401 Unauthorized`
    #[error("Github API Error: {0}")]
    Api(reqwest::StatusCode),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid repository {0:?}, expected github.com/owner/repo")]
    InvalidRepo(String),
    #[error("invalid API URL {0:?}")]
    InvalidUrl(String),
    #[error("unexpected listing: {0}")]
    Listing(String),
    #[error(transparent)]
    Fs(gantry_fs::FsError),
}

/// Read-only access to script files
#[async_trait]
pub(crate) trait ContentSource: Send + Sync {
    /// Raw file contents
    async fn content(&self, path: &str) -> Result<Vec<u8>, RepoError>;

    /// Paths of the entries directly inside `path`
    async fn dir(&self, path: &str) -> Result<Vec<String>, RepoError>;
}

/// Build the source a configuration names
pub(crate) async fn open(config: &SourceConfig) -> Result<Box<dyn ContentSource>> {
    Ok(match config {
        SourceConfig::Local { root } => Box::new(LocalSource::new(root)?),
        SourceConfig::Github {
            repo,
            token,
            api_url,
        } => {
            let token = match token {
                Some(reference) => Some(token::resolve_token(reference).await?),
                None => None,
            };
            let mut source = GithubSource::new(repo, token)?;
            if let Some(api_url) = api_url {
                source = source.with_api_url(api_url)?;
            }
            Box::new(source)
        }
    })
}
