use std::ffi::{CStr, CString};

use libc::{c_char, c_int};

use crate::config::Config;
use crate::error::Result;
use crate::r::ffi::{Callbacks, ParseStatus, Sexp, SexpType, XLen};

/// The typed entry points of an embeddable runtime.
///
/// Almost everything here is `unsafe`: object pointers are only valid while rooted, and calling
/// anything that can raise a runtime error outside `try_eval` would unwind through host frames.
/// Callers must only pass objects of the type each entry point expects.
pub trait RApi {
    /// True if something in this process has already run initialization.
    fn is_initialized(&self) -> bool;

    /// `Rf_initialize_R`. `argv[0]` is the program name.
    unsafe fn initialize(&self, argv: &[CString]) -> c_int;

    /// Overwrites the runtime's console/event callback slots.
    unsafe fn install_callbacks(&self, callbacks: &Callbacks);

    /// Turns off the C stack-depth check, which only knows about the thread that initialized.
    unsafe fn disable_stack_check(&self);

    unsafe fn setup_main_loop(&self);

    unsafe fn alloc_string_vector(&self, len: XLen) -> Sexp;

    unsafe fn protect(&self, s: Sexp) -> Sexp;

    unsafe fn unprotect(&self, n: c_int);

    /// Makes a UTF-8 CHARSXP of `text` and stores it at `v[i]`.
    unsafe fn set_string_elt(&self, v: Sexp, i: XLen, text: &CStr);

    /// `R_ParseVector`. On anything but `PARSE_OK` the result is not an expression vector.
    unsafe fn parse_vector(&self, text: Sexp, status: &mut ParseStatus) -> Sexp;

    unsafe fn length(&self, s: Sexp) -> XLen;

    unsafe fn vector_elt(&self, v: Sexp, i: XLen) -> Sexp;

    unsafe fn global_env(&self) -> Sexp;

    /// Guarded evaluation: failure sets `*error` non-zero instead of jumping.
    unsafe fn try_eval(&self, expr: Sexp, env: Sexp, error: &mut c_int) -> Sexp;

    unsafe fn type_of(&self, s: Sexp) -> SexpType;

    unsafe fn string_elt(&self, v: Sexp, i: XLen) -> Sexp;

    /// Null-terminated contents of a CHARSXP.
    unsafe fn char_ptr(&self, s: Sexp) -> *const c_char;

    unsafe fn raw_ptr(&self, s: Sexp) -> *const u8;

    unsafe fn integer_ptr(&self, s: Sexp) -> *const c_int;

    unsafe fn logical_ptr(&self, s: Sexp) -> *const c_int;

    unsafe fn real_ptr(&self, s: Sexp) -> *const f64;

    /// Distinguishes `NA_real_` from other NaNs.
    fn is_na_real(&self, x: f64) -> bool;

    /// Current protect-stack depth, if the runtime exposes it.
    fn protect_depth(&self) -> Option<usize> {
        None
    }

    // Teardown, in the order `Interpreter::stop` calls them.

    unsafe fn run_dot_last(&self);

    unsafe fn run_exit_finalizers(&self);

    unsafe fn kill_all_devices(&self);

    unsafe fn clean_temp_dir(&self);

    unsafe fn gc(&self);

    unsafe fn end_embedded(&self, fatal: bool);
}

/// A source of runtimes. An `Interpreter` opens its factory at most once.
pub trait Factory {
    type Runtime: RApi;

    fn config(&self) -> &Config;

    /// Locates and loads the runtime. Does not initialize it.
    fn open(&mut self) -> Result<Self::Runtime>;
}
