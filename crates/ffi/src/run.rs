use crate::error::{DefaultWildfireError, WildfireError, WildfireErrorCode};
use crate::helpers::{clear_last_error, into_c_string, read_c_str, track_error};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::ffi::CString;
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use tracing::{error, info};
use wildfire_core::{RunReport, RunRequest};

/// JSON document written to `out_response_json` by [`wildfire_run`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResponse {
    pub success: bool,
    pub message: String,
    pub output_dir: Option<PathBuf>,
    /// Full run report on success
    pub metadata: Option<RunReport>,
    /// Snake-case [`WildfireErrorCode`] name on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl RunResponse {
    fn success(report: RunReport) -> Self {
        Self {
            success: true,
            message: report.message.clone(),
            output_dir: Some(report.output_dir.clone()),
            metadata: Some(report),
            error_kind: None,
        }
    }

    fn failure(error: &DefaultWildfireError) -> Self {
        Self {
            success: false,
            message: error.msg().to_string(),
            output_dir: None,
            metadata: None,
            error_kind: Some(error.code().name().to_string()),
        }
    }
}

fn execute(request_json: &str) -> Result<RunReport, DefaultWildfireError> {
    let request: RunRequest =
        serde_json::from_str(request_json).map_err(|e| DefaultWildfireError::invalid_request(&e.to_string()))?;
    request.execute().map_err(|e| DefaultWildfireError::from(&e))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run one simulation described by a JSON run request.
///
/// The request is a [`RunRequest`] document, e.g.
/// `{"engine":"raster","raster":"county.tif","config":{"ignition":{"mode":"coordinate","lat":38.8,"lon":-77.3}}}`.
/// On return `*out_response_json` always holds a response document with `success`,
/// `message`, `output_dir`, `metadata` and, on failure, `error_kind`. Panics inside the
/// simulation are caught and reported as `Internal`.
///
/// # Returns
/// - `WildfireErrorCode::Ok` on success
/// - `WildfireErrorCode::NullPointer` if `out_response_json` is null (nothing is written)
/// - the code of the failure otherwise; `wildfire_get_last_error` has the message
///
/// # Safety
/// - `request_json` must be null or a null-terminated string valid for the call.
/// - `out_response_json` must be null or valid for writing one pointer.
/// - The response string must be released with `wildfire_string_free`.
///
/// Example (C++)
/// ```cpp
/// char* response = nullptr;
/// WildfireErrorCode err = wildfire_run(request, &response);
/// handle_response(response);
/// wildfire_string_free(response);
/// ```
#[no_mangle]
pub unsafe extern "C" fn wildfire_run(
    request_json: *const c_char,
    out_response_json: *mut *mut c_char,
) -> WildfireErrorCode {
    if out_response_json.is_null() {
        return track_error(&DefaultWildfireError::null_pointer("out_response_json"));
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: forwarded caller contract on `request_json`.
        let text = unsafe { read_c_str(request_json, "request_json") }?;
        execute(text)
    }));
    let result = outcome.unwrap_or_else(|payload| Err(DefaultWildfireError::internal(&panic_message(&*payload))));

    let (response, code) = match result {
        Ok(report) => {
            info!("wildfire_run wrote {}", report.output_dir.display());
            clear_last_error();
            (RunResponse::success(report), WildfireErrorCode::Ok)
        }
        Err(err) => {
            error!("wildfire_run failed ({}): {}", err.code().name(), err.msg());
            (RunResponse::failure(&err), track_error(&err))
        }
    };

    let json = serde_json::to_string(&response).unwrap_or_else(|e| {
        format!(r#"{{"success":false,"message":"response encoding failed: {e}","output_dir":null,"metadata":null,"error_kind":"internal"}}"#)
    });
    // SAFETY: checked non-null above; validity is the caller's contract.
    unsafe {
        *out_response_json = into_c_string(json);
    }
    code
}

/// Release a string returned by this library.
///
/// Null is a no-op.
///
/// # Safety
/// `ptr` must be null or a pointer returned by `wildfire_run` that has not been freed.
#[no_mangle]
pub unsafe extern "C" fn wildfire_string_free(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: the pointer came from `CString::into_raw` in `into_c_string`.
    unsafe {
        drop(CString::from_raw(ptr));
    }
}
