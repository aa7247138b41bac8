//! Engine half of the value bridge
//!
//! Host to engine goes through [`EngineValue`], a `Serialize` view driven by
//! `serde_v8`: byte buffers become `Uint8Array` copies and every integer becomes a
//! JS number.
//!
//! Engine to host goes through `encode()` in `runtime.js`, which flattens a JS
//! value into a tagged shape plus one packed byte blob. [`decode`] turns that back
//! into a [`Value`]. Tag numbers must match `runtime.js`.

use deno_core::ToJsBuffer;
use gantry_value::{MAX_SAFE_INTEGER, Record, Value};
use serde::ser::{Serialize, Serializer};

use crate::error::ScriptError;

const BYTES: i64 = 4;
const ARRAY: i64 = 5;
const RECORD: i64 = 6;
const UNSUPPORTED: i64 = 7;

/// Borrowed value serialized into the engine's representation
pub(crate) struct EngineValue<'a>(pub(crate) &'a Value);

impl Serialize for EngineValue<'_> {
    #[allow(clippy::cast_precision_loss)]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => {
                if i.unsigned_abs() > MAX_SAFE_INTEGER.unsigned_abs() {
                    log::warn!("Integer {i} is outside the engine's safe range, passing it as {}", *i as f64);
                }
                serializer.serialize_f64(*i as f64)
            }
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => ToJsBuffer::from(b.clone()).serialize(serializer),
            Value::Array(items) => serializer.collect_seq(items.iter().map(EngineValue)),
            Value::Record(map) => {
                serializer.collect_map(map.iter().map(|(k, v)| (k, EngineValue(v))))
            }
        }
    }
}

/// Owned counterpart of [`EngineValue`], used as an op return type
pub(crate) struct EngineOwned(pub(crate) Value);

impl Serialize for EngineOwned {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        EngineValue(&self.0).serialize(serializer)
    }
}

/// Rebuild a host value from the shape and blob produced by `encode()`
pub(crate) fn decode(shape: Value, blob: &[u8]) -> Result<Value, ScriptError> {
    let Value::Array(tagged) = shape else {
        return Ok(shape);
    };

    let mut parts = tagged.into_iter();
    let tag = parts.next().and_then(|t| t.as_i64());
    match tag {
        Some(BYTES) => {
            let offset = parts.next().and_then(|v| v.as_i64());
            let len = parts.next().and_then(|v| v.as_i64());
            let (Some(offset), Some(len)) = (offset, len) else {
                return Err(malformed("byte reference without offset and length"));
            };
            let start = usize::try_from(offset).map_err(|_| malformed("negative offset"))?;
            let end = start + usize::try_from(len).map_err(|_| malformed("negative length"))?;
            blob.get(start..end)
                .map(|bytes| Value::Bytes(bytes.to_vec()))
                .ok_or_else(|| malformed("byte reference past the end of the blob"))
        }
        Some(ARRAY) => match parts.next() {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| decode(item, blob))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Err(malformed("array without items")),
        },
        Some(RECORD) => match parts.next() {
            Some(Value::Array(pairs)) => {
                let mut record = Record::new();
                for pair in pairs {
                    let Value::Array(pair) = pair else {
                        return Err(malformed("record entry is not a pair"));
                    };
                    let mut pair = pair.into_iter();
                    let (Some(Value::String(key)), Some(value)) = (pair.next(), pair.next()) else {
                        return Err(malformed("record entry is not a key and value"));
                    };
                    record.insert(key, decode(value, blob)?);
                }
                Ok(Value::Record(record))
            }
            _ => Err(malformed("record without entries")),
        },
        Some(UNSUPPORTED) => {
            let what = parts
                .next()
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or_else(|| "value".to_string());
            Err(ScriptError::Bridge(format!(
                "a {what} has no host representation"
            )))
        }
        _ => Err(malformed("unknown tag")),
    }
}

fn malformed(detail: &str) -> ScriptError {
    ScriptError::Bridge(format!("malformed engine value: {detail}"))
}
