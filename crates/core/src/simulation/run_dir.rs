//! Per-run output directories
//!
//! Every run owns a fresh directory `<base>/<prefix>_<YYYYmmdd_HHMMSS>[_label]`,
//! created with `create_dir` so two runs can never share one. A name collision gets
//! a numeric suffix. Directories are never removed by the library.

use crate::error::Result;
use chrono::Local;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Collision suffixes tried before giving up
const MAX_SUFFIX: u32 = 1000;

/// An exclusively created output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirectory {
    path: PathBuf,
}

impl RunDirectory {
    /// Create a new run directory under `base`, creating `base` if needed
    pub fn create(base: impl AsRef<Path>, prefix: &str, label: Option<&str>) -> Result<Self> {
        let base = base.as_ref();
        fs::create_dir_all(base)?;

        let mut stem = format!("{prefix}_{}", Local::now().format("%Y%m%d_%H%M%S"));
        if let Some(label) = label.map(sanitize).filter(|l| !l.is_empty()) {
            stem.push('_');
            stem.push_str(&label);
        }

        let mut candidate = base.join(&stem);
        let mut suffix = 0;
        loop {
            match fs::create_dir(&candidate) {
                Ok(()) => break,
                Err(e) if e.kind() == ErrorKind::AlreadyExists && suffix < MAX_SUFFIX => {
                    suffix += 1;
                    debug!("{} exists, trying suffix {}", candidate.display(), suffix);
                    candidate = base.join(format!("{stem}_{suffix}"));
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!("Output directory: {}", candidate.display());
        Ok(Self { path: candidate })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// Keep labels to a portable file-name alphabet
fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
