//! Error types for the wildfire simulation core
//!
//! Every fallible operation in the crate returns [`SimError`]. Callers that need to
//! render distinct user-facing messages classify failures with [`SimError::kind`].

use std::path::PathBuf;

/// Coarse failure classes used by boundary layers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad or insufficient input data (terrain table, boundary geometry, raster contents)
    InputData,
    /// Valid data, but the requested run is impossible (ignition off-grid, no fuel)
    Domain,
    /// Filesystem or encoder failure
    Io,
    /// Anything the core did not anticipate
    Internal,
}

/// Errors raised by domain construction, propagation and snapshot output.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("terrain table is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("terrain table row {row}: {message}")]
    MalformedTerrain { row: usize, message: String },

    #[error("terrain table has no data rows")]
    EmptyTerrain,

    #[error("invalid forest boundary: {0}")]
    InvalidBoundary(String),

    #[error("no nodes available to ignite (forest is empty or every density check failed)")]
    NoIgnitableNodes,

    #[error("ignition point ({row}, {col}) is outside the {height}x{width} raster")]
    IgnitionOutOfBounds {
        row: i64,
        col: i64,
        height: usize,
        width: usize,
    },

    #[error("ignition point ({row}, {col}) is not a forest pixel (value {value})")]
    InvalidIgnitionPoint { row: usize, col: usize, value: u8 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read raster {path}: {message}")]
    RasterRead { path: PathBuf, message: String },

    #[error("unsupported raster layout: {0}")]
    RasterFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to encode image: {0}")]
    ImageEncode(#[from] image::ImageError),

    #[error("failed to encode GeoTIFF: {0}")]
    TiffEncode(#[from] tiff::TiffError),
}

impl SimError {
    /// Classify this error for boundary layers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::MissingColumn(_)
            | SimError::MalformedTerrain { .. }
            | SimError::EmptyTerrain
            | SimError::InvalidBoundary(_)
            | SimError::InvalidConfig(_)
            | SimError::RasterFormat(_) => ErrorKind::InputData,
            SimError::NoIgnitableNodes
            | SimError::IgnitionOutOfBounds { .. }
            | SimError::InvalidIgnitionPoint { .. } => ErrorKind::Domain,
            SimError::RasterRead { .. }
            | SimError::Io(_)
            | SimError::ImageEncode(_)
            | SimError::TiffEncode(_) => ErrorKind::Io,
        }
    }
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_are_distinguishable() {
        let oob = SimError::IgnitionOutOfBounds {
            row: -1,
            col: 4,
            height: 5,
            width: 5,
        };
        let fuel = SimError::InvalidIgnitionPoint {
            row: 1,
            col: 1,
            value: 0,
        };

        assert_eq!(oob.kind(), ErrorKind::Domain);
        assert_eq!(fuel.kind(), ErrorKind::Domain);
        assert!(!matches!(oob, SimError::InvalidIgnitionPoint { .. }));
        assert!(oob.to_string().contains("outside"));
        assert!(fuel.to_string().contains("not a forest pixel"));
    }

    #[test]
    fn test_io_errors_wrap() {
        let err: SimError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope").into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_input_errors() {
        assert_eq!(SimError::MissingColumn("Slope").kind(), ErrorKind::InputData);
        assert_eq!(SimError::EmptyTerrain.kind(), ErrorKind::InputData);
    }
}
