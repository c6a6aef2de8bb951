//! `#[repr(C)]` types and string helpers for the FFI boundary.
//!
//! # Design
//! The call state stays opaque to C; hosts only hold a pointer to it. Strings
//! cross the boundary as NUL-terminated UTF-8: inputs are borrowed, outputs
//! are owned by the caller and released with `xda_free_string`.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use xda_core::CallState;

/// Opaque handle to a `CallState`. C callers receive a pointer to this and
/// pass it back into every `xda_call_*` function.
pub struct FfiCall {
    pub(crate) inner: CallState,
}

/// Error codes returned by fallible FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    NullArg = 1,
    InvalidUtf8 = 2,
    Panic = 3,
    /// Header name or value contains CR/LF, or the name contains `": "`.
    InvalidHeader = 4,
}

/// Outcome of `xda_apply_response`.
///
/// `complete` is true when the reply carried a body; the host should then
/// remove the relay frame and run its completion handling.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiApplyResult {
    pub error_code: FfiErrorCode,
    pub complete: bool,
}

impl FfiApplyResult {
    pub(crate) fn ok(complete: bool) -> Self {
        Self {
            error_code: FfiErrorCode::Ok,
            complete,
        }
    }

    pub(crate) fn error(error_code: FfiErrorCode) -> Self {
        Self {
            error_code,
            complete: false,
        }
    }
}

/// Borrow a C string as `&str`.
///
/// Returns `Err(NullArg)` for null and `Err(InvalidUtf8)` for bad UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn str_arg<'a>(ptr: *const c_char) -> Result<&'a str, FfiErrorCode> {
    if ptr.is_null() {
        return Err(FfiErrorCode::NullArg);
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| FfiErrorCode::InvalidUtf8)
}

/// Hand an owned string to C. Strings with interior NULs become null.
pub(crate) fn into_c_string(s: &str) -> *mut c_char {
    CString::new(s)
        .map(CString::into_raw)
        .unwrap_or(std::ptr::null_mut())
}

/// Like `into_c_string`, mapping `None` to null.
pub(crate) fn opt_into_c_string(s: Option<&str>) -> *mut c_char {
    s.map(into_c_string).unwrap_or(std::ptr::null_mut())
}
