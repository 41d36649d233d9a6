use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;
use wildfire_core::SimError;

/// Common interface for FFI error types.
///
/// - `code()` - the error code passed across the FFI boundary
/// - `msg()` - the error message for diagnostics
pub(crate) trait WildfireError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> WildfireErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `WildfireError` for every failure the boundary reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultWildfireError {
    code: WildfireErrorCode,
    msg: String,
}

impl DefaultWildfireError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"request_json"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: WildfireErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for a request that is not valid UTF-8 or not a valid run request.
    pub fn invalid_request(message: &str) -> Self {
        Self {
            code: WildfireErrorCode::InvalidRequest,
            msg: format!("Invalid run request: {message}"),
        }
    }

    /// Create error for a panic caught at the boundary.
    pub fn internal(message: &str) -> Self {
        Self {
            code: WildfireErrorCode::Internal,
            msg: format!("Internal error: {message}"),
        }
    }
}

impl From<&SimError> for DefaultWildfireError {
    fn from(error: &SimError) -> Self {
        let code = match error {
            SimError::IgnitionOutOfBounds { .. } => WildfireErrorCode::OutOfBounds,
            SimError::InvalidIgnitionPoint { .. } => WildfireErrorCode::InvalidIgnitionPoint,
            SimError::NoIgnitableNodes => WildfireErrorCode::NoIgnitableNodes,
            SimError::MissingColumn(_)
            | SimError::MalformedTerrain { .. }
            | SimError::EmptyTerrain
            | SimError::InvalidBoundary(_)
            | SimError::InvalidConfig(_)
            | SimError::RasterFormat(_) => WildfireErrorCode::InputData,
            SimError::RasterRead { .. }
            | SimError::Io(_)
            | SimError::ImageEncode(_)
            | SimError::TiffEncode(_) => WildfireErrorCode::Io,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

impl WildfireError for DefaultWildfireError {
    fn code(&self) -> WildfireErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes returned by wildfire functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildfireErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// The request was not UTF-8 or did not parse as a run request.
    InvalidRequest = 2,

    /// Missing columns, empty terrain, malformed boundary or raster, bad config values.
    InputData = 3,

    /// The ignition point lies outside the raster.
    OutOfBounds = 4,

    /// The ignition pixel is not forest.
    InvalidIgnitionPoint = 5,

    /// The graph has no node that can be ignited.
    NoIgnitableNodes = 6,

    /// Input unreadable or output not writable.
    Io = 7,

    /// A panic was caught at the boundary.
    Internal = 8,
}

impl WildfireErrorCode {
    /// Snake-case name used as `error_kind` in response JSON
    pub fn name(self) -> &'static str {
        match self {
            WildfireErrorCode::Ok => "ok",
            WildfireErrorCode::NullPointer => "null_pointer",
            WildfireErrorCode::InvalidRequest => "invalid_request",
            WildfireErrorCode::InputData => "input_data",
            WildfireErrorCode::OutOfBounds => "out_of_bounds",
            WildfireErrorCode::InvalidIgnitionPoint => "invalid_ignition_point",
            WildfireErrorCode::NoIgnitableNodes => "no_ignitable_nodes",
            WildfireErrorCode::Io => "io",
            WildfireErrorCode::Internal => "internal",
        }
    }
}

thread_local! {
    /// Thread-local storage for the most recent FFI error (C string, error code).
    /// The CString is stored here so the pointer handed out by `wildfire_get_last_error` stays valid.
    static LAST_ERROR: RefCell<(Option<CString>, WildfireErrorCode)> = const { RefCell::new((None, WildfireErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, WildfireErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, WildfireErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if the last call on this thread failed.
/// - `null` if the last call succeeded.
///
/// # Thread Safety
/// Error state is stored per thread.
///
/// # Lifetime
/// The returned pointer is valid until the next `wildfire_*` call on this thread.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```cpp
/// char* response = nullptr;
/// WildfireErrorCode err = wildfire_run(request, &response);
/// if (err != WildfireErrorCode::Ok) {
///     const char* error = wildfire_get_last_error();
///     if (error) {
///         printf("Run failed: %s\n", error);
///     }
/// }
/// wildfire_string_free(response);
/// ```
#[no_mangle]
pub extern "C" fn wildfire_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code.
///
/// Returns `WildfireErrorCode::Ok` (0) if the last call on this thread succeeded.
#[no_mangle]
pub extern "C" fn wildfire_get_last_error_code() -> WildfireErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
