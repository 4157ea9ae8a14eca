use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while driving the embedded runtime.
///
/// `Parse` and `Runtime` come from caller-supplied code and are always handed back verbatim.
/// The rest describe the host environment or a bug in how the runtime is being driven.
#[derive(Debug, Error)]
pub enum Error {
    /// The installation home could not be determined.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No known library name for this OS. A configuration problem, but kept apart so callers
    /// can tell "cannot work here" from "set up wrong".
    #[error("unsupported platform '{0}'")]
    UnsupportedPlatform(String),

    /// The shared library could not be opened.
    #[error("could not load '{}': {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("required symbol '{name}' missing from '{}'", path.display())]
    MissingSymbol { path: PathBuf, name: String },

    #[error("failed to parse: {code}")]
    Parse { code: String },

    #[error("{message} at {code}")]
    Runtime { message: String, code: String },

    /// Protect-stack imbalance, double stop, use after shutdown. Never user-recoverable.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl Error {
    pub fn is_fatal(&self) -> bool {
        matches!(
            *self,
            Error::ProtocolViolation(_) | Error::Load { .. } | Error::MissingSymbol { .. }
        )
    }

    pub(crate) fn home_query(e: io::Error) -> Self {
        Error::Configuration(format!("could not run 'R RHOME': {}", e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
