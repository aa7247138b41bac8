//! # Gantry Value
//!
//! The host-side dynamic value model shared by every gantry crate.
//!
//! A [`Value`] is what flows through process dispatch: positional arguments,
//! native handler results and everything bridged in and out of the script engine.
//! It is a closed tagged union, so shapes the engine cannot represent (functions,
//! maps with non-string keys) never reach it:
//!
//! - Arbitrary Rust data enters through [`to_value`], a dedicated serde serializer
//!   that rejects non-string map keys with [`ValueError::KeyMustBeString`].
//! - Any self-describing serde format can produce a `Value` through its
//!   `Deserialize` impl; byte buffers become [`Value::Bytes`].
//!
//! ```
//! use gantry_value::{Value, to_value};
//! use std::collections::HashMap;
//!
//! let headers = HashMap::from([("Auth", "Test")]);
//! let value = to_value(&headers).unwrap();
//! assert_eq!(value.get("Auth"), Some(&Value::from("Test")));
//!
//! let bad = HashMap::from([(1, 2)]);
//! assert!(to_value(&bad).is_err());
//! ```

mod de;
mod error;
mod ser;
mod value;

pub use error::ValueError;
pub use ser::to_value;
pub use value::{MAX_SAFE_INTEGER, Record, Value};
