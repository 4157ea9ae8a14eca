use std::env;
use std::path::PathBuf;

/// Environment variable naming the runtime's installation directory.
pub const HOME_VAR: &str = "R_HOME";

const DEFAULT_PROGRAM: &str = "rembed";

/// No save prompt, no GUI, no site/user profiles.
const DEFAULT_FLAGS: [&str; 4] = ["--quiet", "--vanilla", "--no-save", "--gui=none"];

/// How to find and start the embedded runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Installation home. When `None` the runtime is asked for it (`R RHOME`).
    pub home: Option<PathBuf>,
    /// argv[0] handed to the init entrypoint.
    pub program: String,
    pub flags: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            home: None,
            program: DEFAULT_PROGRAM.to_string(),
            flags: DEFAULT_FLAGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    /// Default configuration, with the home override taken from `R_HOME` if set and non-empty.
    pub fn from_env() -> Self {
        let home = env::var_os(HOME_VAR)
            .filter(|h| !h.is_empty())
            .map(PathBuf::from);

        Config {
            home,
            ..Config::default()
        }
    }

    pub fn with_home<P: Into<PathBuf>>(mut self, home: P) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn with_program<S: Into<String>>(mut self, program: S) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_flag<S: Into<String>>(mut self, flag: S) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// The full argument vector: program name first, then flags.
    pub fn argv(&self) -> Vec<&str> {
        let mut argv = Vec::with_capacity(self.flags.len() + 1);
        argv.push(self.program.as_str());
        argv.extend(self.flags.iter().map(String::as_str));
        argv
    }
}
