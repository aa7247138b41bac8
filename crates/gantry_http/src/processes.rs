use gantry_process::{Handler, ProcessError, ProcessRegistry};
use gantry_value::Value;
use reqwest::Method;

use crate::client::HttpClient;
use crate::error::RequestError;
use crate::request::{RequestArgs, parse_method};
use crate::response::Response;

/// Argument layout of one `http.*` process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// url, query, headers
    Get,
    /// url, payload, query, headers
    Body,
    /// url, payload, files, query, headers
    Post,
    /// method, url, payload, query, headers, files
    Send,
}

const PROCESSES: [(&str, Layout); 7] = [
    ("http.Get", Layout::Get),
    ("http.Head", Layout::Body),
    ("http.Post", Layout::Post),
    ("http.Put", Layout::Body),
    ("http.Patch", Layout::Body),
    ("http.Delete", Layout::Body),
    ("http.Send", Layout::Send),
];

/// Names of the processes [`register`] installs
pub fn names() -> impl Iterator<Item = &'static str> {
    PROCESSES.iter().map(|(name, _)| *name)
}

/// Register the `http.*` processes backed by `client`
///
/// Every process answers with a response envelope, including when its arguments
/// cannot be converted or do not form a valid request.
pub fn register(registry: &ProcessRegistry, client: &HttpClient) {
    for (name, layout) in PROCESSES {
        let client = client.clone();
        let method = fixed_method(name);
        let handler = Handler::native(move |args| {
            let client = client.clone();
            let method = method.clone();
            async move {
                let response = match layout.arguments(method, args) {
                    Ok(request) => client.send(request).await,
                    Err(e) => Response::failed(400, e.to_string()),
                };
                Ok::<_, ProcessError>(Value::from(response))
            }
        })
        .with_argument_fallback(|err| Value::from(Response::failed(400, err.to_string())));
        registry.register(name, handler);
    }
}

fn fixed_method(name: &str) -> Method {
    match name {
        "http.Head" => Method::HEAD,
        "http.Post" => Method::POST,
        "http.Put" => Method::PUT,
        "http.Patch" => Method::PATCH,
        "http.Delete" => Method::DELETE,
        _ => Method::GET,
    }
}

impl Layout {
    fn arguments(self, method: Method, args: Vec<Value>) -> Result<RequestArgs, RequestError> {
        let mut args = args.into_iter();
        let mut next = || args.next().unwrap_or(Value::Null);

        let method = match self {
            Self::Send => parse_method(&next())?,
            _ => method,
        };
        let mut request = RequestArgs::new(method, next());
        match self {
            Self::Get => {
                request.query = next();
                request.headers = next();
            }
            Self::Body => {
                request.payload = next();
                request.query = next();
                request.headers = next();
            }
            Self::Post => {
                request.payload = next();
                request.files = next();
                request.query = next();
                request.headers = next();
            }
            Self::Send => {
                request.payload = next();
                request.query = next();
                request.headers = next();
                request.files = next();
            }
        }
        Ok(request)
    }
}
