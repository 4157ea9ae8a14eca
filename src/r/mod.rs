//! Embedding of the R runtime.
//!
//! `Interpreter` owns the lifecycle of one runtime and evaluates code on it. `Library` is the
//! production symbol table, loaded from the installation `home` resolves. `embedded` holds the
//! single process-wide instance behind a lock and is what most hosts want.

pub mod console;

pub mod embedded;

pub mod ffi;
pub use self::ffi::Sexp;

pub mod home;

mod interpreter;
pub use self::interpreter::{Handle, Interpreter, Ownership, State};

mod library;
pub use self::library::{Library, LibraryFactory};

mod rooted;
pub use self::rooted::ProtectScope;
