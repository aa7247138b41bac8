use gantry_fs::FsError;

/// Failures while turning process arguments into a request
///
/// These never reach callers as errors; they become a `400` response envelope.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("invalid HTTP method: {0}")]
    Method(String),
    #[error("invalid query: {0}")]
    Query(String),
    #[error("invalid headers: {0}")]
    Header(String),
    #[error("invalid payload: {0}")]
    Payload(String),
    #[error("cannot attach file: {0}")]
    File(#[from] FsError),
}

/// Raised when the HTTP process family cannot be set up
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
