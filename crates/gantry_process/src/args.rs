use gantry_value::{Record, Value};
use serde::de::DeserializeOwned;

use crate::error::ProcessError;

/// Typed access to the positional arguments of a native process
///
/// Missing trailing arguments read as `Null`. Every accessor reports a shape
/// mismatch as [`ProcessError::Argument`].
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    process: &'a str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub fn new(process: &'a str, values: &'a [Value]) -> Self {
        Self { process, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Argument at `index`, or `Null` past the end
    pub fn get(&self, index: usize) -> &'a Value {
        const NULL: &Value = &Value::Null;
        self.values.get(index).unwrap_or(NULL)
    }

    pub fn error(&self, index: usize, message: impl std::fmt::Display) -> ProcessError {
        ProcessError::argument(self.process, format!("argument {index}: {message}"))
    }

    /// # Errors
    ///
    /// Fails unless the argument is a string
    pub fn string(&self, index: usize) -> Result<&'a str, ProcessError> {
        let value = self.get(index);
        value
            .as_str()
            .ok_or_else(|| self.error(index, format!("expected a string, got {}", value.type_name())))
    }

    /// # Errors
    ///
    /// Fails unless the argument is a string or null
    pub fn opt_string(&self, index: usize) -> Result<Option<&'a str>, ProcessError> {
        match self.get(index) {
            Value::Null => Ok(None),
            _ => self.string(index).map(Some),
        }
    }

    /// # Errors
    ///
    /// Fails unless the argument is an integral number
    pub fn int(&self, index: usize) -> Result<i64, ProcessError> {
        let value = self.get(index);
        value
            .as_i64()
            .ok_or_else(|| self.error(index, format!("expected an integer, got {}", value.type_name())))
    }

    /// # Errors
    ///
    /// Fails unless the argument is a boolean or null (read as `false`)
    pub fn flag(&self, index: usize) -> Result<bool, ProcessError> {
        match self.get(index) {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            other => Err(self.error(index, format!("expected a boolean, got {}", other.type_name()))),
        }
    }

    /// # Errors
    ///
    /// Fails unless the argument is a record or null
    pub fn opt_record(&self, index: usize) -> Result<Option<&'a Record>, ProcessError> {
        match self.get(index) {
            Value::Null => Ok(None),
            Value::Record(map) => Ok(Some(map)),
            other => Err(self.error(index, format!("expected a record, got {}", other.type_name()))),
        }
    }

    /// Deserialize an argument into any `serde` type
    ///
    /// # Errors
    ///
    /// Fails when the argument does not match `T`'s shape
    pub fn parse<T: DeserializeOwned>(&self, index: usize) -> Result<T, ProcessError> {
        serde_json::from_value(self.get(index).clone().into_json())
            .map_err(|e| self.error(index, e))
    }
}
