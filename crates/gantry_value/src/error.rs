//! Error type for value conversion

use std::fmt::Display;

/// Raised when host data has no [`Value`](crate::Value) representation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// A map key serialized as something other than a string
    #[error("map keys must be strings, found {0} key")]
    KeyMustBeString(&'static str),
    /// Any other serializer or deserializer failure
    #[error("{0}")]
    Custom(String),
}

impl serde::ser::Error for ValueError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

impl serde::de::Error for ValueError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}
