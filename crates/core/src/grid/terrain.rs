//! Terrain feature table for the graph engine
//!
//! Rows carry `Slope` (degrees), `Elevation` (metres) and `Aspect` (degrees, 0-360).
//! Row `k - 1` feeds node id `k`.

use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Column names looked up in the CSV header
pub const SLOPE_COLUMN: &str = "Slope";
pub const ELEVATION_COLUMN: &str = "Elevation";
pub const ASPECT_COLUMN: &str = "Aspect";

/// One terrain row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainSample {
    /// Slope in degrees
    pub slope: f64,
    /// Elevation in metres
    pub elevation: f64,
    /// Aspect in degrees clockwise from north
    pub aspect: f64,
}

impl TerrainSample {
    pub fn new(slope: f64, elevation: f64, aspect: f64) -> Self {
        Self {
            slope,
            elevation,
            aspect,
        }
    }
}

/// Row-indexed terrain covariates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerrainTable {
    samples: Vec<TerrainSample>,
}

impl TerrainTable {
    /// Build from in-memory samples
    pub fn from_samples(samples: Vec<TerrainSample>) -> Result<Self> {
        if samples.is_empty() {
            return Err(SimError::EmptyTerrain);
        }
        Ok(Self { samples })
    }

    /// Load a CSV file with at least `Slope`, `Elevation` and `Aspect` columns
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_csv_reader(file)
    }

    /// Parse CSV from any reader. Extra columns are ignored.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers().map_err(|e| csv_error(0, &e))?.clone();
        let column = |name: &'static str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or(SimError::MissingColumn(name))
        };
        let slope_idx = column(SLOPE_COLUMN)?;
        let elevation_idx = column(ELEVATION_COLUMN)?;
        let aspect_idx = column(ASPECT_COLUMN)?;

        let mut samples = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| csv_error(row, &e))?;
            let field = |idx: usize, name: &str| -> Result<f64> {
                let raw = record.get(idx).unwrap_or_default();
                raw.parse::<f64>().map_err(|_| SimError::MalformedTerrain {
                    row,
                    message: format!("column '{name}' value '{raw}' is not a number"),
                })
            };
            samples.push(TerrainSample {
                slope: field(slope_idx, SLOPE_COLUMN)?,
                elevation: field(elevation_idx, ELEVATION_COLUMN)?,
                aspect: field(aspect_idx, ASPECT_COLUMN)?,
            });
        }

        debug!("Loaded {} terrain rows", samples.len());
        Self::from_samples(samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&TerrainSample> {
        self.samples.get(row)
    }

    pub fn samples(&self) -> &[TerrainSample] {
        &self.samples
    }

    /// `(min, max)` elevation over the first `rows` samples
    pub fn elevation_range(&self, rows: usize) -> (f64, f64) {
        self.samples
            .iter()
            .take(rows)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
                (lo.min(s.elevation), hi.max(s.elevation))
            })
    }
}

fn csv_error(row: usize, err: &csv::Error) -> SimError {
    SimError::MalformedTerrain {
        row,
        message: err.to_string(),
    }
}
