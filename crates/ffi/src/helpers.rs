use crate::error::{with_last_error_mut, DefaultWildfireError, WildfireError, WildfireErrorCode};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Set the thread-local error message and code.
/// Accepts any type implementing `WildfireError` trait.
pub(crate) fn set_last_error(error: &impl WildfireError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = Some(nul_free(error.msg().to_string()));
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl WildfireError) -> WildfireErrorCode {
    set_last_error(error);
    error.code()
}

/// Clear the thread-local error message and code.
/// Called on successful operations.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = WildfireErrorCode::Ok;
    });
}

/// Borrow a caller-owned C string as UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a null-terminated string valid for the call.
pub(crate) unsafe fn read_c_str<'a>(ptr: *const c_char, param_name: &str) -> Result<&'a str, DefaultWildfireError> {
    if ptr.is_null() {
        return Err(DefaultWildfireError::null_pointer(param_name));
    }
    // SAFETY: non-null and null-terminated per the caller contract.
    let raw = unsafe { CStr::from_ptr(ptr) };
    raw.to_str()
        .map_err(|e| DefaultWildfireError::invalid_request(&format!("{param_name} is not UTF-8: {e}")))
}

/// Hand a Rust string to the caller; released with `wildfire_string_free`.
pub(crate) fn into_c_string(text: String) -> *mut c_char {
    nul_free(text).into_raw()
}

/// Replace interior NUL bytes so the conversion cannot fail
fn nul_free(text: String) -> CString {
    let text = if text.contains('\0') {
        text.replace('\0', " ")
    } else {
        text
    };
    CString::new(text).unwrap_or_default()
}
