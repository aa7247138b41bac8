use std::collections::BTreeMap;

/// String-keyed record; key order is not significant
pub type Record = BTreeMap<String, Value>;

/// Largest integer an IEEE-754 double represents exactly (2^53 - 1)
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Host dynamic value
///
/// `Int` and `Float` together model a number. They compare by exact numeric value, so
/// `Value::Int(2) == Value::Float(2.0)`, and integral doubles read back from a
/// self-describing format are normalized to `Int`.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Record(Record),
}

impl Value {
    /// Byte buffer value
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(data.into())
    }

    /// Empty record
    pub fn record() -> Self {
        Self::Record(Record::new())
    }

    /// Short name of the variant, used in argument error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) | Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "array",
            Self::Record(_) => "record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Null, boolean, number or string
    pub fn is_simple(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::String(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view; integral floats qualify
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(map) => Some(map),
            _ => None,
        }
    }

    /// Record field lookup; `None` for non-records
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_record().and_then(|map| map.get(key))
    }

    /// Text form of a scalar, as used for query strings and header values
    pub fn to_plain_string(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Convert to JSON; bytes become an array of octets, non-finite floats become null
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(b),
            Self::Int(i) => serde_json::Value::from(i),
            Self::Float(f) => serde_json::Number::from_f64(f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s),
            Self::Bytes(b) => serde_json::Value::Array(b.into_iter().map(Into::into).collect()),
            Self::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Value::into_json).collect())
            }
            Self::Record(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into_json())).collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    #[allow(clippy::float_cmp, clippy::cast_precision_loss)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(i), Self::Float(f)) | (Self::Float(f), Self::Int(i)) => int_eq_float(*i, *f),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a == b,
            _ => false,
        }
    }
}

/// Exact numeric equality; `i64::MAX as f64` rounds up to 2^63, hence the range check
#[allow(clippy::float_cmp, clippy::cast_precision_loss)]
fn int_eq_float(i: i64, f: f64) -> bool {
    f.fract() == 0.0
        && f >= i64::MIN as f64
        && f < i64::MAX as f64
        && f as i64 == i
        && i as f64 == f
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::Float(value as f64), Self::Int)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Self::from(value as u64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::from(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Record(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::Record(iter.into_iter().collect())
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::Array(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_compare_numerically() {
        assert_eq!(Value::Int(2), Value::Float(2.0));
        assert_ne!(Value::Int(2), Value::Float(2.5));
        assert_ne!(Value::Int(1), Value::Bool(true));
    }

    #[test]
    fn numbers_compare_exactly_past_the_safe_range() {
        let two_53 = 9_007_199_254_740_992_i64;
        assert_eq!(Value::Int(two_53), Value::Float(two_53 as f64));
        assert_ne!(Value::Int(two_53 + 1), Value::Float(two_53 as f64));
        assert_ne!(Value::Int(i64::MAX), Value::Float(i64::MAX as f64));
        assert_eq!(Value::Int(i64::MIN), Value::Float(i64::MIN as f64));
        assert_ne!(Value::Int(0), Value::Float(f64::NAN));
    }

    #[test]
    fn json_conversion_keeps_shape() {
        let value = Value::from(json!({
            "name": "Lucy",
            "age": 7,
            "tags": ["a", "b"],
            "ratio": 0.5,
            "nothing": null
        }));

        assert_eq!(value.get("name"), Some(&Value::from("Lucy")));
        assert_eq!(value.get("age").and_then(Value::as_i64), Some(7));
        assert_eq!(
            value.get("tags").and_then(Value::as_array).map(<[Value]>::len),
            Some(2)
        );
        assert!(value.get("nothing").is_some_and(Value::is_null));

        assert_eq!(
            value.into_json(),
            json!({"name": "Lucy", "age": 7, "tags": ["a", "b"], "ratio": 0.5, "nothing": null})
        );
    }

    #[test]
    fn bytes_become_octet_arrays_in_json() {
        assert_eq!(Value::bytes(vec![1u8, 2, 255]).into_json(), json!([1, 2, 255]));
    }

    #[test]
    fn huge_unsigned_falls_back_to_float() {
        assert!(matches!(Value::from(u64::MAX), Value::Float(_)));
        assert_eq!(Value::from(42u64), Value::Int(42));
    }

    #[test]
    fn plain_strings_for_scalars_only() {
        assert_eq!(Value::from(3).to_plain_string().as_deref(), Some("3"));
        assert_eq!(Value::from(true).to_plain_string().as_deref(), Some("true"));
        assert_eq!(Value::record().to_plain_string(), None);
    }
}
