use libc::c_int;

use crate::traits::RApi;

use super::ffi::Sexp;

/// Everything protected through a scope is unprotected when the scope drops, on every exit path.
pub struct ProtectScope<'a, R: RApi + ?Sized> {
    rt: &'a R,
    count: c_int,
}

impl<'a, R: RApi + ?Sized> ProtectScope<'a, R> {
    pub fn new(rt: &'a R) -> Self {
        ProtectScope { rt, count: 0 }
    }

    /// Roots `s` until this scope drops.
    pub unsafe fn protect(&mut self, s: Sexp) -> Sexp {
        let s = self.rt.protect(s);
        self.count += 1;
        s
    }

    pub fn count(&self) -> c_int {
        self.count
    }
}

impl<'a, R: RApi + ?Sized> Drop for ProtectScope<'a, R> {
    fn drop(&mut self) {
        if self.count > 0 {
            unsafe { self.rt.unprotect(self.count) }
        }
    }
}
