//! # Gantry HTTP
//!
//! The `http.*` process family: `http.Get`, `http.Head`, `http.Post`, `http.Put`,
//! `http.Patch`, `http.Delete` and `http.Send`.
//!
//! Every call answers with the same envelope, `{Status, Data, Headers, Message}`.
//! Arguments that do not form a valid request produce `Status: 400` before any
//! network I/O, and transport failures produce `Status: 0`; neither is reported
//! as a process error.
//!
//! ```rust,no_run
//! use gantry_http::HttpOptions;
//! use gantry_process::{Dispatcher, Process, ProcessRegistry};
//! use std::collections::HashMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ProcessRegistry::new();
//! gantry_http::register(&registry, &HttpOptions::default())?;
//!
//! let response = Dispatcher::native_only(registry)
//!     .run(
//!         Process::new("http.Get")
//!             .arg("https://example.com/items")
//!             .arg(HashMap::from([("page", 1)]))
//!             .arg(HashMap::from([("Auth", "Test")])),
//!     )
//!     .await?;
//! println!("{:?}", response.get("Status"));
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod processes;
mod request;
mod response;

pub use client::{DEFAULT_HTTP_TIMEOUT, HttpClient, HttpOptions};
pub use error::{HttpError, RequestError};
pub use processes::names;
pub use request::{Body, FormPart, Request, RequestArgs};
pub use response::Response;

use gantry_process::ProcessRegistry;

/// Build a client from `options` and register the `http.*` processes with it
///
/// # Errors
///
/// [`HttpError::Client`] if the HTTP client cannot be created
pub fn register(registry: &ProcessRegistry, options: &HttpOptions) -> Result<(), HttpError> {
    let client = HttpClient::new(options)?;
    processes::register(registry, &client);
    log::debug!("Registered HTTP processes with a {:?} timeout", options.timeout);
    Ok(())
}
