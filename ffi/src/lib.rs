//! C-ABI wrapper around `xda-core`.
//!
//! # Overview
//! Exposes the call state, the wire codec, and the handshake through
//! `extern "C"` functions. It targets hosts that cannot run a Rust
//! `RelayHost` directly (for example a native webview): the C side creates
//! and removes the relay frame itself, forwards the encoded request to the
//! relay document over whatever messaging it has, and feeds the reply back
//! through `xda_apply_response`.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary. Bodies are wrapped in `AssertUnwindSafe`
//!   because a call's completion callback is not `RefUnwindSafe`.
//! - Setters return an `FfiErrorCode`; getters return owned C strings or
//!   null when the field is unset.
//! - The C caller owns all returned pointers and must release them with
//!   `xda_call_free` / `xda_free_string`.

pub mod types;

use std::ffi::CString;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use xda_core::{decode_response, encode_request, CallState, Handshake, SessionId};

use types::*;

// ---------------------------------------------------------------------------
// Call lifecycle
// ---------------------------------------------------------------------------

/// Create a call targeting `api_uri`, with the default method.
///
/// Returns null if `api_uri` is null or not UTF-8.
/// The caller must free the returned pointer with `xda_call_free`.
#[unsafe(no_mangle)]
pub extern "C" fn xda_call_new(api_uri: *const c_char) -> *mut FfiCall {
    catch_unwind(AssertUnwindSafe(|| {
        let Ok(uri) = (unsafe { str_arg(api_uri) }) else {
            return std::ptr::null_mut();
        };
        Box::into_raw(Box::new(FfiCall {
            inner: CallState::new(uri),
        }))
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Free a call created by `xda_call_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn xda_call_free(call: *mut FfiCall) {
    if !call.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(call) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Setters
// ---------------------------------------------------------------------------

/// Run `update` on the call behind `call`, or report a null handle.
fn with_call(
    call: *mut FfiCall,
    update: impl FnOnce(&mut CallState) -> FfiErrorCode,
) -> FfiErrorCode {
    if call.is_null() {
        return FfiErrorCode::NullArg;
    }
    let call = unsafe { &mut *call };
    update(&mut call.inner)
}

/// Set the method. A null `method` clears it so no method is sent.
#[unsafe(no_mangle)]
pub extern "C" fn xda_call_set_method(call: *mut FfiCall, method: *const c_char) -> FfiErrorCode {
    catch_unwind(AssertUnwindSafe(|| {
        with_call(call, |inner| {
            if method.is_null() {
                inner.method = None;
                return FfiErrorCode::Ok;
            }
            match unsafe { str_arg(method) } {
                Ok(m) => {
                    inner.method = Some(m.to_string());
                    FfiErrorCode::Ok
                }
                Err(code) => code,
            }
        })
    }))
    .unwrap_or(FfiErrorCode::Panic)
}

/// Set the body. A null `body` clears it.
#[unsafe(no_mangle)]
pub extern "C" fn xda_call_set_body(call: *mut FfiCall, body: *const c_char) -> FfiErrorCode {
    catch_unwind(AssertUnwindSafe(|| {
        with_call(call, |inner| {
            if body.is_null() {
                inner.body = None;
                return FfiErrorCode::Ok;
            }
            match unsafe { str_arg(body) } {
                Ok(b) => {
                    inner.body = Some(b.to_string());
                    FfiErrorCode::Ok
                }
                Err(code) => code,
            }
        })
    }))
    .unwrap_or(FfiErrorCode::Panic)
}

#[unsafe(no_mangle)]
pub extern "C" fn xda_call_set_request_header(
    call: *mut FfiCall,
    name: *const c_char,
    value: *const c_char,
) -> FfiErrorCode {
    catch_unwind(AssertUnwindSafe(|| {
        with_call(call, |inner| {
            let (name, value) = match unsafe { (str_arg(name), str_arg(value)) } {
                (Ok(n), Ok(v)) => (n, v),
                (Err(code), _) | (_, Err(code)) => return code,
            };
            match inner.set_request_header(name, value) {
                Ok(()) => FfiErrorCode::Ok,
                Err(_) => FfiErrorCode::InvalidHeader,
            }
        })
    }))
    .unwrap_or(FfiErrorCode::Panic)
}

#[unsafe(no_mangle)]
pub extern "C" fn xda_call_set_server_uri(call: *mut FfiCall, uri: *const c_char) -> FfiErrorCode {
    catch_unwind(AssertUnwindSafe(|| {
        with_call(call, |inner| match unsafe { str_arg(uri) } {
            Ok(u) => {
                inner.server_uri = Some(u.to_string());
                FfiErrorCode::Ok
            }
            Err(code) => code,
        })
    }))
    .unwrap_or(FfiErrorCode::Panic)
}

#[unsafe(no_mangle)]
pub extern "C" fn xda_call_set_relay_uri(call: *mut FfiCall, uri: *const c_char) -> FfiErrorCode {
    catch_unwind(AssertUnwindSafe(|| {
        with_call(call, |inner| match unsafe { str_arg(uri) } {
            Ok(u) => {
                inner.relay_uri = Some(u.to_string());
                FfiErrorCode::Ok
            }
            Err(code) => code,
        })
    }))
    .unwrap_or(FfiErrorCode::Panic)
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

/// Build the relay frame address for `session_id`, handshake included.
///
/// Returns null if `call` is null or its relay or server URI is unset.
#[unsafe(no_mangle)]
pub extern "C" fn xda_handshake_src(call: *const FfiCall, session_id: u64) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if call.is_null() {
            return std::ptr::null_mut();
        }
        let call = unsafe { &(*call).inner };
        match (call.relay_uri.as_deref(), call.server_uri.as_deref()) {
            (Some(relay), Some(server)) => {
                into_c_string(&Handshake::new(SessionId(session_id), server).frame_src(relay))
            }
            _ => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Encode the call into request wire text for the relay document.
///
/// Returns null if `call` is null.
#[unsafe(no_mangle)]
pub extern "C" fn xda_encode_request(call: *const FfiCall) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if call.is_null() {
            return std::ptr::null_mut();
        }
        let call = unsafe { &(*call).inner };
        into_c_string(&encode_request(call))
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Decode the relay document's reply and copy it into the call.
///
/// Fields absent from `text` keep their previous values.
#[unsafe(no_mangle)]
pub extern "C" fn xda_apply_response(call: *mut FfiCall, text: *const c_char) -> FfiApplyResult {
    catch_unwind(AssertUnwindSafe(|| {
        if call.is_null() {
            return FfiApplyResult::error(FfiErrorCode::NullArg);
        }
        let text = match unsafe { str_arg(text) } {
            Ok(t) => t,
            Err(code) => return FfiApplyResult::error(code),
        };
        let call = unsafe { &mut (*call).inner };
        FfiApplyResult::ok(call.apply_response(&decode_response(text)))
    }))
    .unwrap_or(FfiApplyResult::error(FfiErrorCode::Panic))
}

// ---------------------------------------------------------------------------
// Getters
// ---------------------------------------------------------------------------

/// Response status, or -1 when none has been received (or `call` is null).
#[unsafe(no_mangle)]
pub extern "C" fn xda_call_status(call: *const FfiCall) -> i32 {
    if call.is_null() {
        return -1;
    }
    let call = unsafe { &(*call).inner };
    call.status.map(i32::from).unwrap_or(-1)
}

/// 0 while the call is pending, 4 once the body arrived.
#[unsafe(no_mangle)]
pub extern "C" fn xda_call_ready_state(call: *const FfiCall) -> u8 {
    if call.is_null() {
        return 0;
    }
    let call = unsafe { &(*call).inner };
    call.ready_state() as u8
}

#[unsafe(no_mangle)]
pub extern "C" fn xda_call_status_text(call: *const FfiCall) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if call.is_null() {
            return std::ptr::null_mut();
        }
        let call = unsafe { &(*call).inner };
        opt_into_c_string(call.status_text.as_deref())
    }))
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn xda_call_response_text(call: *const FfiCall) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if call.is_null() {
            return std::ptr::null_mut();
        }
        let call = unsafe { &(*call).inner };
        opt_into_c_string(call.response_text.as_deref())
    }))
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn xda_call_all_response_headers(call: *const FfiCall) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if call.is_null() {
            return std::ptr::null_mut();
        }
        let call = unsafe { &(*call).inner };
        opt_into_c_string(call.all_response_headers())
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Value of response header `name`, or null if it was not received.
#[unsafe(no_mangle)]
pub extern "C" fn xda_call_response_header(
    call: *const FfiCall,
    name: *const c_char,
) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if call.is_null() {
            return std::ptr::null_mut();
        }
        let Ok(name) = (unsafe { str_arg(name) }) else {
            return std::ptr::null_mut();
        };
        let call = unsafe { &(*call).inner };
        opt_into_c_string(call.response_header(name))
    }))
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn xda_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { CString::from_raw(s) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
