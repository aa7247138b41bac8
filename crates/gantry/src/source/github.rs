use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use url::Url;

use super::{ContentSource, RepoError};

const DEFAULT_API_URL: &str = "https://api.github.com";
const RAW: &str = "application/vnd.github.raw+json";
const JSON: &str = "application/vnd.github+json";

/// Scripts from a GitHub repository, through the contents API
pub(crate) struct GithubSource {
    client: reqwest::Client,
    api_url: Url,
    owner: String,
    repo: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    path: String,
}

impl GithubSource {
    /// `repo` is `github.com/owner/repo`, `owner/repo` or a repository URL.
    /// Public repositories need no token.
    pub(crate) fn new(repo: &str, token: Option<String>) -> Result<Self, RepoError> {
        let (owner, name) = parse_repo(repo)?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("gantry/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let api_url =
            Url::parse(DEFAULT_API_URL).map_err(|_| RepoError::InvalidUrl(DEFAULT_API_URL.into()))?;

        Ok(Self {
            client,
            api_url,
            owner,
            repo: name,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub(crate) fn with_api_url(mut self, api_url: &str) -> Result<Self, RepoError> {
        self.api_url = Url::parse(api_url).map_err(|_| RepoError::InvalidUrl(api_url.into()))?;
        Ok(self)
    }

    fn contents_url(&self, path: &str) -> Result<Url, RepoError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| RepoError::InvalidUrl(self.api_url.to_string()))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"])
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    async fn get(&self, path: &str, accept: &str) -> Result<reqwest::Response, RepoError> {
        let url = self.contents_url(path)?;
        log::debug!("Fetching {url}");

        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(RepoError::NotFound(format!(
                "Github API Error: {}",
                StatusCode::NOT_FOUND
            ))),
            status => Err(RepoError::Api(status)),
        }
    }
}

#[async_trait]
impl ContentSource for GithubSource {
    async fn content(&self, path: &str) -> Result<Vec<u8>, RepoError> {
        let response = self.get(path, RAW).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn dir(&self, path: &str) -> Result<Vec<String>, RepoError> {
        let listing: serde_json::Value = self.get(path, JSON).await?.json().await?;
        if !listing.is_array() {
            return Err(RepoError::Listing(format!("{path} is not a directory")));
        }
        let entries: Vec<Entry> =
            serde_json::from_value(listing).map_err(|e| RepoError::Listing(e.to_string()))?;
        Ok(entries
            .into_iter()
            .map(|entry| format!("/{}", entry.path.trim_start_matches('/')))
            .collect())
    }
}

fn parse_repo(repo: &str) -> Result<(String, String), RepoError> {
    let trimmed = repo
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("github.com/")
        .trim_end_matches('/')
        .trim_end_matches(".git");

    let mut parts = trimmed.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(RepoError::InvalidRepo(repo.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer, token: Option<&str>) -> GithubSource {
        GithubSource::new("github.com/yaoapp/gou", token.map(str::to_string))
            .unwrap()
            .with_api_url(&server.uri())
            .unwrap()
    }

    #[tokio::test]
    async fn public_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/yaoapp/gou/contents/tests/app/app.yao"))
            .and(header("accept", RAW))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name": "Pet Hospital"}"#))
            .mount(&server)
            .await;

        let content = source(&server, None).content("/tests/app/app.yao").await.unwrap();
        assert!(!content.is_empty());
        assert!(String::from_utf8(content).unwrap().contains("Pet Hospital"));
    }

    #[tokio::test]
    async fn dir_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/yaoapp/gou/contents/tests/app"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "app.yao", "path": "tests/app/app.yao", "type": "file"},
                {"name": "workshop.yao", "path": "tests/app/workshop.yao", "type": "file"},
                {"name": "models", "path": "tests/app/models", "type": "dir"},
            ])))
            .mount(&server)
            .await;

        let dirs = source(&server, None).dir("/tests/app").await.unwrap();
        assert_eq!(dirs.len(), 3);
        assert!(dirs.contains(&"/tests/app/workshop.yao".to_string()));
    }

    #[tokio::test]
    async fn dir_of_a_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"path": "README.md"})))
            .mount(&server)
            .await;

        let err = source(&server, None).dir("/README.md").await.unwrap_err();
        assert!(matches!(err, RepoError::Listing(_)));
    }

    #[tokio::test]
    async fn private_content_sends_the_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/yaoapp/gou/contents/README.md"))
            .and(header("authorization", "Bearer ghp_secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string("# workshop-tests-private"))
            .mount(&server)
            .await;

        let content = source(&server, Some("ghp_secret")).content("/README.md").await.unwrap();
        assert!(String::from_utf8(content).unwrap().contains("# workshop-tests-private"));

        // without the header nothing matches and the server answers 404
        assert!(source(&server, None).content("/README.md").await.is_err());
    }

    #[tokio::test]
    async fn missing_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let err = source(&server, None).content("/test/app/app.yao").await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
        assert_eq!(err.to_string(), "Github API Error: 404 Not Found");
    }

    #[tokio::test]
    async fn other_statuses_are_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = source(&server, Some("expired")).content("/README.md").await.unwrap_err();
        assert!(matches!(err, RepoError::Api(StatusCode::UNAUTHORIZED)));
        assert_eq!(err.to_string(), "Github API Error: 401 Unauthorized");
    }

    #[test]
    fn repo_names() {
        for repo in [
            "github.com/yaoapp/gou",
            "yaoapp/gou",
            "https://github.com/yaoapp/gou.git",
        ] {
            assert_eq!(
                parse_repo(repo).unwrap(),
                ("yaoapp".to_string(), "gou".to_string()),
                "{repo}"
            );
        }
        assert!(parse_repo("github.com/yaoapp").is_err());
        assert!(parse_repo("github.com/yaoapp/gou/tree").is_err());
    }
}
