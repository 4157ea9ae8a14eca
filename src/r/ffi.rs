//! C-level types shared by the runtime's API and the callbacks it invokes.

use libc::{c_char, c_int, c_uint, c_void};

/// `R_xlen_t`.
pub type XLen = isize;

/// `SEXPTYPE`.
pub type SexpType = c_uint;

pub const NILSXP: SexpType = 0;
pub const ENVSXP: SexpType = 4;
pub const LANGSXP: SexpType = 6;
pub const CHARSXP: SexpType = 9;
pub const LGLSXP: SexpType = 10;
pub const INTSXP: SexpType = 13;
pub const REALSXP: SexpType = 14;
pub const STRSXP: SexpType = 16;
pub const EXPRSXP: SexpType = 20;
pub const RAWSXP: SexpType = 24;

/// `ParseStatus`.
pub type ParseStatus = c_int;

pub const PARSE_NULL: ParseStatus = 0;
pub const PARSE_OK: ParseStatus = 1;
pub const PARSE_INCOMPLETE: ParseStatus = 2;
pub const PARSE_ERROR: ParseStatus = 3;
pub const PARSE_EOF: ParseStatus = 4;

/// `cetype_t` value for UTF-8 encoded CHARSXPs.
pub const CE_UTF8: c_int = 1;

/// `NA_INTEGER` and `NA_LOGICAL`.
pub const NA_INTEGER: c_int = c_int::MIN;

/// An object pointer (`SEXP`). Only meaningful to the runtime that produced it.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sexp(pub *mut c_void);

impl Sexp {
    pub fn null() -> Self {
        Sexp(std::ptr::null_mut())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

pub type WriteConsoleEx = unsafe extern "C" fn(*const c_char, c_int, c_int);
pub type WriteConsole = unsafe extern "C" fn(*const c_char, c_int);
pub type ShowMessage = unsafe extern "C" fn(*const c_char);
/// `(SA_TYPE saveact, int status, int runLast)`.
pub type CleanUp = unsafe extern "C" fn(c_int, c_int, c_int);
pub type ProcessEvents = unsafe extern "C" fn();
pub type Busy = unsafe extern "C" fn(c_int);

/// The host-side functions installed into the runtime's callback slots.
#[derive(Clone, Copy)]
pub struct Callbacks {
    pub write: WriteConsoleEx,
    pub show_message: ShowMessage,
    pub cleanup: CleanUp,
    pub process_events: ProcessEvents,
    pub busy: Busy,
}
