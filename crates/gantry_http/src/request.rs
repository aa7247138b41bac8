//! Request construction
//!
//! Turns positional process arguments into a [`Request`]. Nothing here touches the
//! network; the only I/O is reading payload files from the configured backend.

use std::path::Path;

use gantry_fs::FsObject;
use gantry_value::Value;
use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use url::Url;

use crate::error::RequestError;

const MULTIPART: &str = "multipart/form-data";

/// Raw arguments of one HTTP process call
#[derive(Debug, Clone)]
pub struct RequestArgs {
    pub method: Method,
    pub url: Value,
    pub payload: Value,
    pub files: Value,
    pub query: Value,
    pub headers: Value,
}

impl RequestArgs {
    pub fn new(method: Method, url: impl Into<Value>) -> Self {
        Self {
            method,
            url: url.into(),
            payload: Value::Null,
            files: Value::Null,
            query: Value::Null,
            headers: Value::Null,
        }
    }
}

/// Request body, chosen from the payload and files arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Vec<u8>),
    Raw(Vec<u8>),
    Text(String),
    Multipart(Vec<FormPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Field {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

/// A validated request, ready to send
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Body,
}

impl Request {
    /// Validate `args` and encode the body; files are read through `files`
    ///
    /// # Errors
    ///
    /// A [`RequestError`] naming the argument that could not be used
    pub fn build(args: RequestArgs, files: &FsObject) -> Result<Self, RequestError> {
        let url = merge_query(parse_url(&args.url)?, &args.query)?;
        let caller = parse_headers(&args.headers)?;

        let multipart = caller
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with(MULTIPART));
        let (body, default_type) = encode_payload(args.payload, &args.files, multipart, files)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(content_type) = default_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        // replaces every default sharing a name with a caller header
        headers.extend(caller);
        if matches!(body, Body::Multipart(_)) {
            // the client writes its own, with the boundary
            headers.remove(CONTENT_TYPE);
        }

        Ok(Self {
            method: args.method,
            url,
            headers,
            body,
        })
    }

    pub(crate) fn into_builder(
        self,
        client: &reqwest::Client,
    ) -> Result<reqwest::RequestBuilder, RequestError> {
        let builder = client.request(self.method, self.url).headers(self.headers);
        Ok(match self.body {
            Body::Empty => builder,
            Body::Json(bytes) | Body::Raw(bytes) => builder.body(bytes),
            Body::Text(text) => builder.body(text),
            Body::Multipart(parts) => {
                let mut form = Form::new();
                for part in parts {
                    form = match part {
                        FormPart::Field { name, value } => form.text(name, value),
                        FormPart::File {
                            name,
                            file_name,
                            mime,
                            bytes,
                        } => {
                            let part = Part::bytes(bytes)
                                .file_name(file_name)
                                .mime_str(&mime)
                                .map_err(|e| RequestError::Payload(e.to_string()))?;
                            form.part(name, part)
                        }
                    };
                }
                builder.multipart(form)
            }
        })
    }
}

/// Parse an HTTP method name, case-insensitively
pub(crate) fn parse_method(value: &Value) -> Result<Method, RequestError> {
    let name = value
        .as_str()
        .ok_or_else(|| RequestError::Method(format!("expected a string, got {}", value.type_name())))?;
    Method::from_bytes(name.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| RequestError::Method(name.to_string()))
}

fn parse_url(value: &Value) -> Result<Url, RequestError> {
    let raw = value
        .as_str()
        .ok_or_else(|| RequestError::Url(format!("expected a string, got {}", value.type_name())))?;
    Url::parse(raw).map_err(|e| RequestError::Url(format!("{raw}: {e}")))
}

fn merge_query(mut url: Url, query: &Value) -> Result<Url, RequestError> {
    let params = match query {
        Value::Null => return Ok(url),
        Value::Record(params) => params,
        other => {
            return Err(RequestError::Query(format!(
                "expected a record, got {}",
                other.type_name()
            )));
        }
    };

    let mut encoded = Vec::new();
    for (name, value) in params {
        for item in one_or_many(value) {
            let text = simple_text(item)
                .ok_or_else(|| RequestError::Query(format!("{name} has a {} value", item.type_name())))?;
            encoded.push((name.as_str(), text));
        }
    }
    if !encoded.is_empty() {
        url.query_pairs_mut().extend_pairs(encoded);
    }
    Ok(url)
}

fn parse_headers(value: &Value) -> Result<HeaderMap, RequestError> {
    let mut headers = HeaderMap::new();
    let fields = match value {
        Value::Null => return Ok(headers),
        Value::Record(fields) => fields,
        other => {
            return Err(RequestError::Header(format!(
                "expected a record, got {}",
                other.type_name()
            )));
        }
    };

    for (name, value) in fields {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RequestError::Header(format!("{name:?} is not a valid header name")))?;
        for item in one_or_many(value) {
            let text = item
                .to_plain_string()
                .ok_or_else(|| RequestError::Header(format!("{name} has a {} value", item.type_name())))?;
            let value = HeaderValue::from_str(&text)
                .map_err(|_| RequestError::Header(format!("{text:?} is not a valid value for {name}")))?;
            headers.append(header.clone(), value);
        }
    }
    Ok(headers)
}

fn encode_payload(
    payload: Value,
    attachments: &Value,
    multipart: bool,
    files: &FsObject,
) -> Result<(Body, Option<&'static str>), RequestError> {
    match attachments {
        Value::Null => {}
        Value::Record(attachments) => {
            let mut parts = match payload {
                Value::Null => Vec::new(),
                Value::Record(fields) => fields
                    .into_iter()
                    .map(|(name, value)| form_field(name, value))
                    .collect::<Result<Vec<_>, _>>()?,
                other => {
                    return Err(RequestError::Payload(format!(
                        "multipart fields must be a record, got {}",
                        other.type_name()
                    )));
                }
            };
            for (name, path) in attachments {
                let path = path.as_str().ok_or_else(|| {
                    RequestError::Payload(format!("file {name} must be a path, got {}", path.type_name()))
                })?;
                parts.push(attach(files, name, path)?);
            }
            return Ok((Body::Multipart(parts), None));
        }
        other => {
            return Err(RequestError::Payload(format!(
                "files must be a record, got {}",
                other.type_name()
            )));
        }
    }

    Ok(match payload {
        Value::Null => (Body::Empty, None),
        Value::String(path) if multipart => (Body::Multipart(vec![attach(files, "file", &path)?]), None),
        Value::String(text) => (Body::Text(text), Some("text/plain; charset=utf-8")),
        Value::Bytes(bytes) => (Body::Raw(bytes), Some("application/octet-stream")),
        other => {
            let json = serde_json::to_vec(&other.into_json())
                .map_err(|e| RequestError::Payload(e.to_string()))?;
            (Body::Json(json), Some("application/json"))
        }
    })
}

fn form_field(name: String, value: Value) -> Result<FormPart, RequestError> {
    let value = match value {
        Value::String(text) => text,
        other => serde_json::to_string(&other.into_json())
            .map_err(|e| RequestError::Payload(e.to_string()))?,
    };
    Ok(FormPart::Field { name, value })
}

fn attach(files: &FsObject, name: &str, path: &str) -> Result<FormPart, RequestError> {
    let bytes = files.read_file_buffer(path)?;
    let mime = files.mime_type(path)?;
    let file_name = Path::new(path)
        .file_name()
        .map_or_else(|| name.to_string(), |n| n.to_string_lossy().into_owned());
    log::debug!("Attaching {path} ({mime}, {} bytes) as {name}", bytes.len());
    Ok(FormPart::File {
        name: name.to_string(),
        file_name,
        mime,
        bytes,
    })
}

fn one_or_many(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        single => std::slice::from_ref(single),
    }
}

fn simple_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        other => other.to_plain_string(),
    }
}
