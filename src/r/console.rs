//! Callbacks the runtime invokes from inside its own native frames.
//!
//! None of these may unwind or report failure back: there is no safe way through the caller's
//! stack. Whatever goes wrong is logged and dropped.

use std::cell::RefCell;
use std::ffi::CStr;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::slice;
use std::sync::{Mutex, PoisonError};

use lazy_static::lazy_static;
use libc::{c_char, c_int};
use log::error;

use super::ffi::Callbacks;

lazy_static! {
    static ref SINK: Mutex<Box<dyn Write + Send>> = Mutex::new(Box::new(io::stdout()));
}

thread_local! {
    // Callbacks run on the evaluating thread, so this catches exactly that thread's output.
    static THREAD_SINK: RefCell<Option<Box<dyn Write>>> = RefCell::new(None);
}

/// The set installed by `Interpreter::start`.
pub const CALLBACKS: Callbacks = Callbacks {
    write: write_console_ex,
    show_message,
    cleanup,
    process_events,
    busy,
};

/// Redirects console output, returning the previous sink.
pub fn set_sink<W: Write + Send + 'static>(w: W) -> Box<dyn Write + Send> {
    let mut sink = SINK.lock().unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *sink, Box::new(w))
}

/// Sends console output back to standard output.
pub fn reset_sink() {
    set_sink(io::stdout());
}

/// Redirects console output produced by evaluations on the current thread only, overriding the
/// process-wide sink. `None` removes the override. Returns the previous override.
pub fn set_thread_sink(w: Option<Box<dyn Write>>) -> Option<Box<dyn Write>> {
    THREAD_SINK.with(|s| std::mem::replace(&mut *s.borrow_mut(), w))
}

fn write_to<W: Write + ?Sized>(sink: &mut W, text: &str) -> io::Result<()> {
    sink.write_all(text.as_bytes())?;
    // Flush every time so runtime output interleaves with the host's.
    sink.flush()
}

fn emit(bytes: &[u8]) -> io::Result<()> {
    let text = String::from_utf8_lossy(bytes);
    let local = THREAD_SINK.with(|s| match s.try_borrow_mut() {
        Ok(mut s) => s.as_mut().map(|w| write_to(&mut **w, &text)),
        // Re-entered from inside the thread sink itself; fall through to the global one.
        Err(_) => None,
    });
    match local {
        Some(r) => r,
        None => write_to(&mut **SINK.lock().unwrap_or_else(PoisonError::into_inner), &text),
    }
}

fn guarded<F: FnOnce() -> io::Result<()>>(what: &str, f: F) {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("console {} failed: {}", what, e),
        Err(_) => error!("console {} panicked", what),
    }
}

/// `ptr_R_WriteConsoleEx`. Regular and error output both go to the sink.
pub unsafe extern "C" fn write_console_ex(buf: *const c_char, len: c_int, _otype: c_int) {
    guarded("write", || {
        if buf.is_null() || len <= 0 {
            return Ok(());
        }
        emit(slice::from_raw_parts(buf as *const u8, len as usize))
    })
}

/// `ptr_R_ShowMessage`.
pub unsafe extern "C" fn show_message(buf: *const c_char) {
    guarded("message", || {
        if buf.is_null() {
            return Ok(());
        }
        emit(CStr::from_ptr(buf).to_bytes())
    })
}

/// `ptr_R_CleanUp`. Shutdown belongs to `Interpreter::stop`, so no save prompt and no exit.
pub unsafe extern "C" fn cleanup(_saveact: c_int, _status: c_int, _run_last: c_int) {}

pub unsafe extern "C" fn process_events() {}

pub unsafe extern "C" fn busy(_which: c_int) {}
