use gantry_value::{Value, ValueError, to_value};
use serde::Serialize;

use crate::error::ProcessError;

/// A named invocation with positional arguments
///
/// Arguments given as arbitrary serializable data are converted immediately. A
/// failed conversion is kept and reported when the process is run, before any
/// handler sees it.
#[derive(Debug, Clone)]
pub struct Process {
    name: String,
    args: Vec<Value>,
    invalid: Option<(usize, ValueError)>,
}

impl Process {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            invalid: None,
        }
    }

    /// Append an argument converted from serializable data
    #[must_use]
    pub fn arg(mut self, data: impl Serialize) -> Self {
        match to_value(&data) {
            Ok(value) => self.args.push(value),
            Err(err) => {
                if self.invalid.is_none() {
                    self.invalid = Some((self.args.len(), err));
                }
                self.args.push(Value::Null);
            }
        }
        self
    }

    /// Append an argument that already is a [`Value`]
    #[must_use]
    pub fn value(mut self, value: Value) -> Self {
        self.args.push(value);
        self
    }

    #[must_use]
    pub fn values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.args.extend(values);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Split into name and arguments, surfacing a held conversion failure
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Argument`] if an argument could not be converted
    pub fn into_parts(self) -> Result<(String, Vec<Value>), ProcessError> {
        match self.invalid {
            Some((index, err)) => Err(ProcessError::from_value_error(&self.name, index, &err)),
            None => Ok((self.name, self.args)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn converts_arguments_in_order() {
        let process = Process::new("http.Get")
            .arg("https://example.com")
            .arg(HashMap::from([("page", 1)]))
            .value(Value::Null);

        let (name, args) = process.into_parts().unwrap();
        assert_eq!(name, "http.Get");
        assert_eq!(args.len(), 3);
        assert_eq!(args[0], Value::from("https://example.com"));
        assert_eq!(args[1].get("page"), Some(&Value::Int(1)));
    }

    #[test]
    fn holds_the_first_conversion_error() {
        let process = Process::new("utils.sum")
            .arg(1)
            .arg(HashMap::from([(1, 2)]))
            .arg(HashMap::from([(true, 2)]));
        assert_eq!(process.args().len(), 3);

        let err = process.into_parts().unwrap_err();
        assert!(matches!(err, ProcessError::Argument { ref process, .. } if process == "utils.sum"));
        assert!(err.to_string().contains("argument 1"));
        assert!(err.to_string().contains("map keys must be strings"));
    }
}
