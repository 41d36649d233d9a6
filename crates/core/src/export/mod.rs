//! Per-timestep snapshot output
//!
//! One file per step in the run directory, named with a zero-padded step index so
//! a lexicographic sort of the directory reconstructs the timeline.

mod geotiff;
mod png;

pub use geotiff::GeoTiffSnapshotWriter;
pub use png::{PngSnapshotWriter, PALETTE};

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Serializes one state per step
pub trait SnapshotWriter<S> {
    /// File name for `step`, without directory
    fn file_name(&self, step: u32) -> String;

    /// Write `state` as step `step` into `dir`, returning the file path
    fn write(&self, state: &S, step: u32, dir: &Path) -> Result<PathBuf>;
}
