//! Host-side results of an evaluation.

use std::ffi::CStr;
use std::slice;

use crate::r::ffi::{self, Sexp};
use crate::traits::RApi;

/// A marshaled evaluation result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A character scalar, the first element of a string vector, or a length-one
    /// numeric/logical vector rendered as text.
    Text(String),
    /// Anything without a host representation. Not rooted: it may be collected by the next
    /// evaluation unless the caller protects it.
    Handle(Sexp),
    /// Contents of a raw vector, copied out before the vector was released.
    Bytes(Box<[u8]>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match *self {
            Value::Text(ref s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match *self {
            Value::Bytes(ref b) => Some(b),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<Sexp> {
        match *self {
            Value::Handle(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

unsafe fn char_text<R: RApi + ?Sized>(rt: &R, c: Sexp) -> String {
    let p = rt.char_ptr(c);
    if p.is_null() {
        return String::new();
    }
    CStr::from_ptr(p).to_string_lossy().into_owned()
}

/// Significant digits `as.character` keeps.
const CHARACTER_DIGITS: usize = 15;

fn real_text<R: RApi + ?Sized>(rt: &R, x: f64) -> String {
    let s = if x.is_nan() {
        if rt.is_na_real(x) { "NA" } else { "NaN" }
    } else if x == f64::INFINITY {
        "Inf"
    } else if x == f64::NEG_INFINITY {
        "-Inf"
    } else {
        return format_real(x);
    };
    s.to_string()
}

/// Formats a finite double the way `as.character` does: at most 15 significant digits, trailing
/// zeros dropped, and fixed notation unless scientific is strictly narrower.
fn format_real(x: f64) -> String {
    if x == 0.0 {
        return "0".to_string();
    }

    let rounded = format!("{:.*e}", CHARACTER_DIGITS - 1, x.abs());
    let (mantissa, exp) = match rounded.split_once('e') {
        Some((m, e)) => match e.parse::<i32>() {
            Ok(e) => (m, e),
            Err(_) => return x.to_string(),
        },
        None => return x.to_string(),
    };
    let digits = mantissa.replace('.', "");
    let digits = digits.trim_end_matches('0');
    let nsig = digits.len() as i32;

    let fixed = if exp < 0 {
        format!("0.{}{}", "0".repeat((-exp - 1) as usize), digits)
    } else if nsig <= exp + 1 {
        format!("{}{}", digits, "0".repeat((exp + 1 - nsig) as usize))
    } else {
        let (int, frac) = digits.split_at((exp + 1) as usize);
        format!("{}.{}", int, frac)
    };

    let (lead, rest) = digits.split_at(1);
    let sci = format!(
        "{}{}{}e{}{:02}",
        lead,
        if rest.is_empty() { "" } else { "." },
        rest,
        if exp < 0 { '-' } else { '+' },
        exp.abs()
    );

    let body = if fixed.len() <= sci.len() { fixed } else { sci };
    if x < 0.0 {
        format!("-{}", body)
    } else {
        body
    }
}

/// Converts a rooted object into a host value. `s` must stay protected for the duration.
pub unsafe fn marshal<R: RApi + ?Sized>(rt: &R, s: Sexp) -> Value {
    match rt.type_of(s) {
        ffi::CHARSXP => Value::Text(char_text(rt, s)),
        // Only element 0 is taken; the rest are dropped.
        ffi::STRSXP if rt.length(s) > 0 => Value::Text(char_text(rt, rt.string_elt(s, 0))),
        ffi::RAWSXP => {
            let n = rt.length(s).max(0) as usize;
            let bytes = if n == 0 {
                Vec::new()
            } else {
                slice::from_raw_parts(rt.raw_ptr(s), n).to_vec()
            };
            Value::Bytes(bytes.into_boxed_slice())
        }
        ffi::REALSXP if rt.length(s) == 1 => Value::Text(real_text(rt, *rt.real_ptr(s))),
        ffi::INTSXP if rt.length(s) == 1 => {
            let i = *rt.integer_ptr(s);
            Value::Text(if i == ffi::NA_INTEGER { "NA".to_string() } else { i.to_string() })
        }
        ffi::LGLSXP if rt.length(s) == 1 => {
            let b = match *rt.logical_ptr(s) {
                ffi::NA_INTEGER => "NA",
                0 => "FALSE",
                _ => "TRUE",
            };
            Value::Text(b.to_string())
        }
        _ => Value::Handle(s),
    }
}
