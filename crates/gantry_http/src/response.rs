use std::collections::BTreeMap;

use gantry_value::{Record, Value};
use reqwest::header::CONTENT_TYPE;

/// Outcome of an HTTP process, success or failure alike
///
/// Converts into a record `{Status, Data, Headers, Message}`. `Status` is `0`
/// when no response was received and `400` when the request could not be built;
/// `Message` then says why.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub data: Value,
    pub headers: BTreeMap<String, Vec<String>>,
    pub message: Option<String>,
}

impl Response {
    pub fn failed(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            data: Value::Null,
            headers: BTreeMap::new(),
            message: Some(message.into()),
        }
    }

    /// Read status, headers and body from a received response
    pub(crate) async fn read(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in response.headers() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);

        match response.bytes().await {
            Ok(body) => Self {
                status,
                data: decode_body(content_type.as_deref(), &body),
                headers,
                message: None,
            },
            Err(e) => Self {
                status: 0,
                data: Value::Null,
                headers,
                message: Some(format!("failed to read response body: {e}")),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<Response> for Value {
    fn from(response: Response) -> Self {
        let headers: Record = response
            .headers
            .into_iter()
            .map(|(name, values)| (name, values.into_iter().map(Value::from).collect()))
            .collect();

        let mut record = Record::new();
        record.insert("Status".into(), Value::from(u32::from(response.status)));
        record.insert("Data".into(), response.data);
        record.insert("Headers".into(), Value::Record(headers));
        record.insert("Message".into(), Value::from(response.message));
        Value::Record(record)
    }
}

/// JSON for JSON content types, then text, then raw bytes
fn decode_body(content_type: Option<&str>, body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    if content_type.is_some_and(|ct| ct.contains("json")) {
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(json) => return Value::from(json),
            Err(e) => log::warn!("Response declared JSON but did not parse: {e}"),
        }
    }
    match std::str::from_utf8(body) {
        Ok(text) => Value::from(text),
        Err(_) => Value::bytes(body),
    }
}
