//! The process-wide interpreter.
//!
//! Every call goes through one global lock, since the runtime keeps unsynchronized global state.
//! Evaluations block for as long as the runtime runs; there is no way to interrupt one.

use std::panic;
use std::sync::{Mutex, MutexGuard, Once, PoisonError, TryLockError};

use lazy_static::lazy_static;
use log::{error, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::value::Value;

use super::ffi::Sexp;
use super::interpreter::{Handle, Interpreter, Ownership, State};
use super::library::LibraryFactory;

pub type EmbeddedInterpreter = Interpreter<LibraryFactory>;

lazy_static! {
    static ref EMBEDDED: Mutex<EmbeddedInterpreter> =
        Mutex::new(Interpreter::new(LibraryFactory::new(Config::from_env())));
}

static EXIT_HOOK: Once = Once::new();

fn lock() -> MutexGuard<'static, EmbeddedInterpreter> {
    // Every operation leaves the protect stack balanced, so a panic elsewhere doesn't poison the state.
    EMBEDDED.lock().unwrap_or_else(PoisonError::into_inner)
}

extern "C" fn stop_at_exit() {
    let r = panic::catch_unwind(|| {
        let mut interp = match EMBEDDED.try_lock() {
            Ok(g) => g,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => {
                warn!("interpreter busy at exit; skipping shutdown");
                return;
            }
        };
        if interp.state() == State::Running {
            if let Err(e) = interp.stop(false) {
                error!("shutdown at exit failed: {}", e);
            }
        }
    });
    if r.is_err() {
        error!("shutdown at exit panicked");
    }
}

fn start_locked(interp: &mut EmbeddedInterpreter) -> Result<Handle> {
    let handle = interp.start()?;
    if handle.ownership() == Ownership::Owned {
        EXIT_HOOK.call_once(|| {
            if unsafe { libc::atexit(stop_at_exit) } != 0 {
                warn!("could not register exit hook; call stop() before exiting");
            }
        });
    }
    Ok(handle)
}

/// Replaces the configuration. Only possible before the runtime has started.
pub fn configure(config: Config) -> Result<()> {
    let mut interp = lock();
    match interp.state() {
        State::Uninitialized => {
            *interp = Interpreter::new(LibraryFactory::new(config));
            Ok(())
        }
        _ => Err(Error::ProtocolViolation(
            "cannot reconfigure a started runtime".to_string(),
        )),
    }
}

/// Starts (or adopts) the process-wide runtime. Idempotent.
pub fn start() -> Result<Handle> {
    start_locked(&mut lock())
}

/// Evaluates `code` on the process-wide runtime, starting it if needed.
pub fn evaluate(code: &str, env: Option<Sexp>) -> Result<Value> {
    let mut interp = lock();
    start_locked(&mut interp)?;
    interp.evaluate(code, env)
}

/// Shuts the process-wide runtime down. A second call is a protocol violation.
pub fn stop(fatal: bool) -> Result<()> {
    lock().stop(fatal)
}

pub fn state() -> State {
    lock().state()
}

/// Runs `f` with the lock held, for sequences that must not interleave with other callers.
pub fn with_interpreter<T, F>(f: F) -> T
where
    F: FnOnce(&mut EmbeddedInterpreter) -> T,
{
    f(&mut lock())
}
