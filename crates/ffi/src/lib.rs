//! C ABI for the wildfire simulation core
//!
//! A host passes a JSON run request to [`wildfire_run`] and receives a JSON response;
//! failures are also reported through a numeric [`WildfireErrorCode`] and the
//! thread-local last-error slot. No panic unwinds across the boundary.

mod error;
mod helpers;
mod run;

// Re-exports
pub use error::{wildfire_get_last_error, wildfire_get_last_error_code, WildfireErrorCode};
pub use run::{wildfire_run, wildfire_string_free, RunResponse};
