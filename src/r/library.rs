use std::env;
use std::ffi::{CStr, CString};
use std::path::{Path, PathBuf};
use std::ptr;

use libc::{c_char, c_int, c_uint};
use log::{debug, info};

use crate::config::{Config, HOME_VAR};
use crate::error::{Error, Result};
use crate::traits::{Factory, RApi};

use super::ffi::{
    Busy, Callbacks, CleanUp, ParseStatus, ProcessEvents, Sexp, SexpType, ShowMessage,
    WriteConsole, WriteConsoleEx, XLen, CE_UTF8, STRSXP,
};
use super::home;

/// The runtime's shared library, with every entry point resolved up front.
pub struct Library {
    path: PathBuf,

    initialize_r: unsafe extern "C" fn(c_int, *mut *mut c_char) -> c_int,
    setup_rmainloop: unsafe extern "C" fn(),

    // Callback slots and globals. These point at variables inside the library.
    write_console_ex: *mut Option<WriteConsoleEx>,
    write_console: *mut Option<WriteConsole>,
    show_message: *mut Option<ShowMessage>,
    cleanup: *mut Option<CleanUp>,
    process_events: *mut Option<ProcessEvents>,
    busy: *mut Option<Busy>,
    global_env: *mut Sexp,
    nil_value: *mut Sexp,
    pp_stack_top: Option<*mut c_int>,
    c_stack_limit: *mut usize,

    alloc_vector: unsafe extern "C" fn(SexpType, XLen) -> Sexp,
    protect: unsafe extern "C" fn(Sexp) -> Sexp,
    unprotect: unsafe extern "C" fn(c_int),
    mk_char_ce: unsafe extern "C" fn(*const c_char, c_int) -> Sexp,
    set_string_elt: unsafe extern "C" fn(Sexp, XLen, Sexp),
    parse_vector: unsafe extern "C" fn(Sexp, c_int, *mut ParseStatus, Sexp) -> Sexp,
    xlength: unsafe extern "C" fn(Sexp) -> XLen,
    vector_elt: unsafe extern "C" fn(Sexp, XLen) -> Sexp,
    try_eval: unsafe extern "C" fn(Sexp, Sexp, *mut c_int) -> Sexp,
    type_of: unsafe extern "C" fn(Sexp) -> c_int,
    string_elt: unsafe extern "C" fn(Sexp, XLen) -> Sexp,
    r_char: unsafe extern "C" fn(Sexp) -> *const c_char,
    raw: unsafe extern "C" fn(Sexp) -> *mut u8,
    integer: unsafe extern "C" fn(Sexp) -> *mut c_int,
    logical: unsafe extern "C" fn(Sexp) -> *mut c_int,
    real: unsafe extern "C" fn(Sexp) -> *mut f64,
    is_na: unsafe extern "C" fn(f64) -> c_int,

    dot_last: unsafe extern "C" fn(),
    run_exit_finalizers: unsafe extern "C" fn(),
    kill_all_devices: unsafe extern "C" fn(),
    clean_temp_dir: unsafe extern "C" fn(),
    gc: unsafe extern "C" fn(),
    end_embedded: unsafe extern "C" fn(c_int),

    // Last, so the entry points above never outlive it.
    _lib: libloading::Library,
}

// The library is only ever driven from behind one lock.
unsafe impl Send for Library {}

unsafe fn symbol<T: Copy>(lib: &libloading::Library, path: &Path, name: &str) -> Result<T> {
    let mut cname = Vec::with_capacity(name.len() + 1);
    cname.extend_from_slice(name.as_bytes());
    cname.push(0);

    lib.get::<T>(&cname)
        .map(|sym| *sym)
        .map_err(|_| Error::MissingSymbol {
            path: path.to_path_buf(),
            name: name.to_string(),
        })
}

impl Library {
    pub fn load(path: &Path) -> Result<Self> {
        unsafe {
            let lib = libloading::Library::new(path).map_err(|e| Error::Load {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

            let pp_stack_top = symbol::<*mut c_int>(&lib, path, "R_PPStackTop").ok();
            if pp_stack_top.is_none() {
                debug!("R_PPStackTop not exported; protect balance will not be verified");
            }

            let r = Library {
                path: path.to_path_buf(),
                initialize_r: symbol(&lib, path, "Rf_initialize_R")?,
                setup_rmainloop: symbol(&lib, path, "setup_Rmainloop")?,
                write_console_ex: symbol(&lib, path, "ptr_R_WriteConsoleEx")?,
                write_console: symbol(&lib, path, "ptr_R_WriteConsole")?,
                show_message: symbol(&lib, path, "ptr_R_ShowMessage")?,
                cleanup: symbol(&lib, path, "ptr_R_CleanUp")?,
                process_events: symbol(&lib, path, "ptr_R_ProcessEvents")?,
                busy: symbol(&lib, path, "ptr_R_Busy")?,
                global_env: symbol(&lib, path, "R_GlobalEnv")?,
                nil_value: symbol(&lib, path, "R_NilValue")?,
                pp_stack_top,
                c_stack_limit: symbol(&lib, path, "R_CStackLimit")?,
                alloc_vector: symbol(&lib, path, "Rf_allocVector")?,
                protect: symbol(&lib, path, "Rf_protect")?,
                unprotect: symbol(&lib, path, "Rf_unprotect")?,
                mk_char_ce: symbol(&lib, path, "Rf_mkCharCE")?,
                set_string_elt: symbol(&lib, path, "SET_STRING_ELT")?,
                parse_vector: symbol(&lib, path, "R_ParseVector")?,
                xlength: symbol(&lib, path, "Rf_xlength")?,
                vector_elt: symbol(&lib, path, "VECTOR_ELT")?,
                try_eval: symbol(&lib, path, "R_tryEval")?,
                type_of: symbol(&lib, path, "TYPEOF")?,
                string_elt: symbol(&lib, path, "STRING_ELT")?,
                r_char: symbol(&lib, path, "R_CHAR")?,
                raw: symbol(&lib, path, "RAW")?,
                integer: symbol(&lib, path, "INTEGER")?,
                logical: symbol(&lib, path, "LOGICAL")?,
                real: symbol(&lib, path, "REAL")?,
                is_na: symbol(&lib, path, "R_IsNA")?,
                dot_last: symbol(&lib, path, "R_dot_Last")?,
                run_exit_finalizers: symbol(&lib, path, "R_RunExitFinalizers")?,
                kill_all_devices: symbol(&lib, path, "Rf_KillAllDevices")?,
                clean_temp_dir: symbol(&lib, path, "R_CleanTempDir")?,
                gc: symbol(&lib, path, "R_gc")?,
                end_embedded: symbol(&lib, path, "Rf_endEmbeddedR")?,
                _lib: lib,
            };

            info!("loaded {}", path.display());
            Ok(r)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RApi for Library {
    fn is_initialized(&self) -> bool {
        unsafe { (*self.write_console_ex).is_some() || !(*self.global_env).is_null() }
    }

    unsafe fn initialize(&self, argv: &[CString]) -> c_int {
        // Rf_initialize_R may keep these around, so they live as long as the process.
        let mut args: Vec<*mut c_char> = argv
            .iter()
            .map(|a| a.clone().into_raw())
            .collect();
        let argc = args.len() as c_int;
        let r = (self.initialize_r)(argc, args.as_mut_ptr());
        std::mem::forget(args);
        r
    }

    unsafe fn install_callbacks(&self, callbacks: &Callbacks) {
        *self.write_console_ex = Some(callbacks.write);
        *self.write_console = None;
        *self.show_message = Some(callbacks.show_message);
        *self.cleanup = Some(callbacks.cleanup);
        *self.process_events = Some(callbacks.process_events);
        *self.busy = Some(callbacks.busy);
    }

    unsafe fn disable_stack_check(&self) {
        // (uintptr_t) -1 is the runtime's own "no limit" value.
        *self.c_stack_limit = usize::MAX;
    }

    unsafe fn setup_main_loop(&self) {
        (self.setup_rmainloop)()
    }

    unsafe fn alloc_string_vector(&self, len: XLen) -> Sexp {
        (self.alloc_vector)(STRSXP, len)
    }

    unsafe fn protect(&self, s: Sexp) -> Sexp {
        (self.protect)(s)
    }

    unsafe fn unprotect(&self, n: c_int) {
        (self.unprotect)(n)
    }

    unsafe fn set_string_elt(&self, v: Sexp, i: XLen, text: &CStr) {
        let c = (self.mk_char_ce)(text.as_ptr(), CE_UTF8);
        (self.set_string_elt)(v, i, c)
    }

    unsafe fn parse_vector(&self, text: Sexp, status: &mut ParseStatus) -> Sexp {
        (self.parse_vector)(text, -1, status, *self.nil_value)
    }

    unsafe fn length(&self, s: Sexp) -> XLen {
        (self.xlength)(s)
    }

    unsafe fn vector_elt(&self, v: Sexp, i: XLen) -> Sexp {
        (self.vector_elt)(v, i)
    }

    unsafe fn global_env(&self) -> Sexp {
        *self.global_env
    }

    unsafe fn try_eval(&self, expr: Sexp, env: Sexp, error: &mut c_int) -> Sexp {
        (self.try_eval)(expr, env, error)
    }

    unsafe fn type_of(&self, s: Sexp) -> SexpType {
        (self.type_of)(s) as c_uint
    }

    unsafe fn string_elt(&self, v: Sexp, i: XLen) -> Sexp {
        (self.string_elt)(v, i)
    }

    unsafe fn char_ptr(&self, s: Sexp) -> *const c_char {
        (self.r_char)(s)
    }

    unsafe fn raw_ptr(&self, s: Sexp) -> *const u8 {
        (self.raw)(s)
    }

    unsafe fn integer_ptr(&self, s: Sexp) -> *const c_int {
        (self.integer)(s)
    }

    unsafe fn logical_ptr(&self, s: Sexp) -> *const c_int {
        (self.logical)(s)
    }

    unsafe fn real_ptr(&self, s: Sexp) -> *const f64 {
        (self.real)(s)
    }

    fn is_na_real(&self, x: f64) -> bool {
        unsafe { (self.is_na)(x) != 0 }
    }

    fn protect_depth(&self) -> Option<usize> {
        self.pp_stack_top
            .map(|top| unsafe { ptr::read_volatile(top) }.max(0) as usize)
    }

    unsafe fn run_dot_last(&self) {
        (self.dot_last)()
    }

    unsafe fn run_exit_finalizers(&self) {
        (self.run_exit_finalizers)()
    }

    unsafe fn kill_all_devices(&self) {
        (self.kill_all_devices)()
    }

    unsafe fn clean_temp_dir(&self) {
        (self.clean_temp_dir)()
    }

    unsafe fn gc(&self) {
        (self.gc)()
    }

    unsafe fn end_embedded(&self, fatal: bool) {
        (self.end_embedded)(fatal as c_int)
    }
}

/// Resolves the installation from a `Config` and loads its library.
pub struct LibraryFactory {
    config: Config,
}

impl LibraryFactory {
    pub fn new(config: Config) -> Self {
        LibraryFactory { config }
    }
}

impl Factory for LibraryFactory {
    type Runtime = Library;

    fn config(&self) -> &Config {
        &self.config
    }

    fn open(&mut self) -> Result<Library> {
        let home = home::resolve_home(&self.config)?;
        let path = home::library_path(&home)?;
        let lib = Library::load(&path)?;
        // The runtime reads this during initialization to find its own resources.
        env::set_var(HOME_VAR, &home);
        Ok(lib)
    }
}
