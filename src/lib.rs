//! Drives an embedded R interpreter from Rust.
//!
//! The runtime's shared library is located and loaded at first use, initialized once per
//! process, and given console callbacks that print to the host's standard output. Code is
//! parsed, evaluated under a guarded call that reports errors instead of jumping, and the result
//! is converted to a host `Value`.
//!
//! ```no_run
//! let v = rembed::evaluate("1+1", None).unwrap();
//! assert_eq!(v.as_text(), Some("2"));
//! ```

mod config;
pub use crate::config::{Config, HOME_VAR};

mod error;
pub use crate::error::{Error, Result};

pub mod r;
pub use crate::r::embedded::{configure, evaluate, start, stop};
pub use crate::r::{Handle, Interpreter, Ownership, Sexp, State};


mod traits;
pub use crate::traits::{Factory, RApi};

mod value;
pub use crate::value::{marshal, Value};
