use std::ffi::CString;
use std::sync::atomic::{AtomicU64, Ordering};

use libc::c_int;
use log::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::traits::{Factory, RApi};
use crate::value::{self, Value};

use super::console;
use super::ffi::{self, Sexp};
use super::rooted::ProtectScope;

/// Fetches the last error message with its newlines removed.
const DIAGNOSTIC: &str = "gsub('\\n', '', geterrmessage())";

const UNKNOWN_ERROR: &str = "unknown error";

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Running,
    ShutDown,
}

/// Whether we ran the runtime's initialization, or found it already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owned,
    Adopted,
}

/// Token for a running interpreter. Repeated `start` calls hand out equal handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle {
    serial: u64,
    ownership: Ownership,
}

impl Handle {
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }
}

enum Lifecycle<R> {
    Uninitialized,
    Running { runtime: R, handle: Handle },
    ShutDown,
}

/// Owner of the embedded runtime.
///
/// There can only be one live runtime per process, and it is not thread-safe: callers must
/// serialize every call on an `Interpreter`. `r::embedded` does this for the process-wide one.
pub struct Interpreter<F: Factory> {
    factory: F,
    lifecycle: Lifecycle<F::Runtime>,
}

impl<F: Factory> Interpreter<F> {
    pub fn new(factory: F) -> Self {
        Interpreter {
            factory,
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    pub fn state(&self) -> State {
        match self.lifecycle {
            Lifecycle::Uninitialized => State::Uninitialized,
            Lifecycle::Running { .. } => State::Running,
            Lifecycle::ShutDown => State::ShutDown,
        }
    }

    pub fn handle(&self) -> Option<Handle> {
        match self.lifecycle {
            Lifecycle::Running { handle, .. } => Some(handle),
            _ => None,
        }
    }

    pub fn runtime(&self) -> Option<&F::Runtime> {
        match self.lifecycle {
            Lifecycle::Running { ref runtime, .. } => Some(runtime),
            _ => None,
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Loads and initializes the runtime, or adopts one already running in this process.
    /// Does nothing if already running.
    pub fn start(&mut self) -> Result<Handle> {
        match self.lifecycle {
            Lifecycle::Running { handle, .. } => return Ok(handle),
            Lifecycle::ShutDown => {
                return Err(Error::ProtocolViolation(
                    "the runtime cannot be restarted after shutdown".to_string(),
                ))
            }
            Lifecycle::Uninitialized => {}
        }

        let argv = self
            .factory
            .config()
            .argv()
            .into_iter()
            .map(CString::new)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Configuration(format!("invalid startup argument: {}", e)))?;

        let runtime = self.factory.open()?;

        let ownership = if runtime.is_initialized() {
            // Initializing twice is fatal; whoever got here first owns it.
            warn!("runtime already initialized in this process; adopting it");
            Ownership::Adopted
        } else {
            unsafe {
                let status = runtime.initialize(&argv);
                if status != 0 {
                    warn!("runtime initialization returned {}", status);
                }
                // Evaluations run on whichever thread holds the lock, not the one that initialized.
                runtime.disable_stack_check();
                runtime.install_callbacks(&console::CALLBACKS);
                runtime.setup_main_loop();
            }
            info!("runtime initialized");
            Ownership::Owned
        };

        let handle = Handle {
            serial: NEXT_SERIAL.fetch_add(1, Ordering::SeqCst),
            ownership,
        };
        self.lifecycle = Lifecycle::Running { runtime, handle };
        Ok(handle)
    }

    /// Tears the runtime down. Only valid once, and only for a runtime this interpreter
    /// initialized itself.
    pub fn stop(&mut self, fatal: bool) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Running { ref runtime, handle } if handle.ownership == Ownership::Owned => unsafe {
                runtime.run_dot_last();
                runtime.run_exit_finalizers();
                runtime.kill_all_devices();
                runtime.clean_temp_dir();
                runtime.gc();
                runtime.end_embedded(fatal);
            },
            Lifecycle::Running { .. } => {
                return Err(Error::ProtocolViolation(
                    "cannot stop a runtime owned by another embedder".to_string(),
                ))
            }
            Lifecycle::Uninitialized => {
                return Err(Error::ProtocolViolation("stop before start".to_string()))
            }
            Lifecycle::ShutDown => {
                error!("runtime stopped twice");
                return Err(Error::ProtocolViolation("runtime already stopped".to_string()));
            }
        }

        self.lifecycle = Lifecycle::ShutDown;
        info!("runtime shut down (fatal: {})", fatal);
        Ok(())
    }

    /// Parses and evaluates `code` in `env` (the global environment if `None`), starting the
    /// runtime first if needed.
    pub fn evaluate(&mut self, code: &str, env: Option<Sexp>) -> Result<Value> {
        self.start()?;
        match self.lifecycle {
            Lifecycle::Running { ref runtime, .. } => eval_checked(runtime, code, env),
            _ => Err(Error::ProtocolViolation("runtime is not running".to_string())),
        }
    }
}

/// Evaluates, then verifies the protect stack is where it started, where the runtime lets us look.
fn eval_checked<R: RApi + ?Sized>(rt: &R, code: &str, env: Option<Sexp>) -> Result<Value> {
    let before = rt.protect_depth();
    let r = eval(rt, code, env, true);

    if let (Some(before), Some(after)) = (before, rt.protect_depth()) {
        if before != after {
            error!("protect stack went from {} to {} evaluating {:?}", before, after, code);
            return Err(Error::ProtocolViolation(format!(
                "protect stack imbalance ({} -> {})",
                before, after
            )));
        }
    }

    r
}

fn eval<R: RApi + ?Sized>(rt: &R, code: &str, env: Option<Sexp>, diagnose: bool) -> Result<Value> {
    debug!("evaluating {:?}", code);
    let parse_error = || Error::Parse { code: code.to_string() };
    let text = CString::new(code).map_err(|_| parse_error())?;

    // Unprotect is LIFO, so the source vector and the parse result stay rooted alongside the
    // result until the whole call unwinds.
    let mut scope = ProtectScope::new(rt);
    unsafe {
        let cmd = scope.protect(rt.alloc_string_vector(1));
        rt.set_string_elt(cmd, 0, &text);

        let mut status = ffi::PARSE_NULL;
        let exprs = scope.protect(rt.parse_vector(cmd, &mut status));
        if status != ffi::PARSE_OK {
            return Err(parse_error());
        }

        let n = rt.length(exprs);
        if n == 0 {
            return Err(parse_error());
        }
        if n > 1 {
            warn!("only the first of {} expressions is evaluated: {:?}", n, code);
        }

        let env = env.unwrap_or_else(|| rt.global_env());
        let mut failed: c_int = 0;
        let result = scope.protect(rt.try_eval(rt.vector_elt(exprs, 0), env, &mut failed));

        if failed != 0 {
            let message = if diagnose {
                diagnostic(rt)
            } else {
                UNKNOWN_ERROR.to_string()
            };
            return Err(Error::Runtime {
                message,
                code: code.to_string(),
            });
        }

        Ok(value::marshal(rt, result))
    }
}

fn diagnostic<R: RApi + ?Sized>(rt: &R) -> String {
    match eval(rt, DIAGNOSTIC, None, false) {
        Ok(Value::Text(m)) => m.replace('\n', ""),
        Ok(v) => {
            warn!("error message came back as {:?}", v);
            UNKNOWN_ERROR.to_string()
        }
        Err(e) => {
            warn!("could not fetch error message: {}", e);
            UNKNOWN_ERROR.to_string()
        }
    }
}
