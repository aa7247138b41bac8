//! # Gantry FS
//!
//! Named filesystem backends and the host logic of the `FS` capability object.
//!
//! A backend is a name bound to a canonical root directory. [`FsObject`] performs
//! every operation against one backend through *virtual* paths, so a script holding
//! `new FS("data")` can never reach outside the `data` root:
//!
//! ```
//! use gantry_fs::{Backends, FsObject};
//! use gantry_value::Value;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let backends = Backends::new();
//! backends.register("data", dir.path()).unwrap();
//!
//! let fs = FsObject::with_backends("data", backends);
//! fs.call("WriteFile", &[Value::from("/hello.txt"), Value::from("hi")]).unwrap();
//! assert_eq!(fs.call("ReadFile", &[Value::from("/hello.txt")]).unwrap(), Value::from("hi"));
//! assert!(fs.call("ReadFile", &[Value::from("/../escape")]).is_err());
//! ```

mod backends;
mod error;
mod object;
mod path;

pub use backends::{Backends, backends};
pub use error::FsError;
pub use object::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, FsObject, METHODS, sniff_mime};
