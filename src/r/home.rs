//! Finding the installation: its home directory and the shared library inside it.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::config::Config;
use crate::error::{Error, Result};

/// Installation home: the configured override, else whatever `R RHOME` prints.
pub fn resolve_home(config: &Config) -> Result<PathBuf> {
    if let Some(ref home) = config.home {
        debug!("using configured home {}", home.display());
        return Ok(home.clone());
    }

    let output = Command::new("R").arg("RHOME").output().map_err(Error::home_query)?;
    if !output.status.success() {
        return Err(Error::Configuration(format!("'R RHOME' exited with {}", output.status)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let home = parse_home_output(&stdout).ok_or_else(|| {
        Error::Configuration("'R RHOME' did not print an installation home".to_string())
    })?;
    debug!("discovered home {}", home.display());
    Ok(home)
}

/// First line of `R RHOME` output that isn't a warning.
pub fn parse_home_output(output: &str) -> Option<PathBuf> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("WARNING"))
        .map(PathBuf::from)
}

/// Shared library file name for an OS name as reported by `std::env::consts::OS`.
pub fn library_file_name(os: &str) -> Result<&'static str> {
    match os {
        "linux" => Ok("libR.so"),
        "macos" => Ok("libR.dylib"),
        other => Err(Error::UnsupportedPlatform(other.to_string())),
    }
}

pub fn library_path(home: &Path) -> Result<PathBuf> {
    library_file_name(env::consts::OS).map(|name| home.join("lib").join(name))
}
