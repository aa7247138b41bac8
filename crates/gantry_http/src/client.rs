use std::time::Duration;

use gantry_fs::{Backends, FsObject};

use crate::error::HttpError;
use crate::request::{Request, RequestArgs};
use crate::response::Response;

/// Default overall limit for one HTTP call
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct HttpOptions {
    /// Overall limit for a request, from connect to the end of the body
    pub timeout: Duration,
    /// Backend that payload and attachment file paths resolve against
    pub file_backend: String,
    pub backends: Backends,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
            file_backend: "system".to_string(),
            backends: gantry_fs::backends().clone(),
        }
    }
}

/// Shared client behind every `http.*` process
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    files: FsObject,
}

impl HttpClient {
    /// # Errors
    ///
    /// [`HttpError::Client`] if the TLS backend cannot be initialized
    pub fn new(options: &HttpOptions) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;
        Ok(Self {
            client,
            files: FsObject::with_backends(&options.file_backend, options.backends.clone()),
        })
    }

    /// Build and send a request
    ///
    /// Never fails: construction problems answer `400`, transport problems `0`.
    pub async fn send(&self, args: RequestArgs) -> Response {
        let files = self.files.clone();
        let built = tokio::task::spawn_blocking(move || Request::build(args, &files)).await;
        match built {
            Ok(Ok(request)) => self.execute(request).await,
            Ok(Err(e)) => {
                log::debug!("Rejected HTTP request: {e}");
                Response::failed(400, e.to_string())
            }
            Err(e) => Response::failed(400, format!("request construction failed: {e}")),
        }
    }

    /// Send a request that has already been built
    pub async fn execute(&self, request: Request) -> Response {
        let target = format!("{} {}", request.method, request.url);
        let builder = match request.into_builder(&self.client) {
            Ok(builder) => builder,
            Err(e) => return Response::failed(400, e.to_string()),
        };

        log::debug!("Sending {target}");
        match builder.send().await {
            Ok(response) => {
                let response = Response::read(response).await;
                log::debug!("{target} answered {}", response.status);
                response
            }
            Err(e) => {
                log::warn!("{target} failed: {e}");
                Response::failed(0, e.to_string())
            }
        }
    }
}
