//! Classified land-cover rasters for the cellular-automaton engine
//!
//! A [`StateGrid`] is a row-major array of [`CellState`] with row 0 at the top, as
//! stored in the source `GeoTIFF`. [`ClassifiedRaster`] pairs it with the georeference
//! read from the file so ignition coordinates can be resolved and output stays
//! aligned with the input.

use crate::core_types::{CellState, SimRng};
use crate::error::{Result, SimError};
use crate::grid::georef::{GeoKeys, GeoReference, GeoTransform};
use crate::simulation::RasterIgnition;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tiff::decoder::{ifd::Value, Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::{debug, info, warn};

/// `GeoTIFF` tag numbers
pub(crate) const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub(crate) const TAG_MODEL_TIEPOINT: u16 = 33922;
pub(crate) const TAG_MODEL_TRANSFORMATION: u16 = 34264;
pub(crate) const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
pub(crate) const TAG_GEO_DOUBLE_PARAMS: u16 = 34736;
pub(crate) const TAG_GEO_ASCII_PARAMS: u16 = 34737;

/// Row-major cell states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateGrid {
    rows: usize,
    cols: usize,
    cells: Vec<CellState>,
}

impl StateGrid {
    /// Grid filled with one state
    pub fn filled(rows: usize, cols: usize, state: CellState) -> Self {
        Self {
            rows,
            cols,
            cells: vec![state; rows * cols],
        }
    }

    /// Decode raw class values; unknown classes become `NoForest`.
    ///
    /// Returns the grid and the number of unknown values replaced.
    pub fn from_codes(rows: usize, cols: usize, codes: &[u8]) -> Result<(Self, usize)> {
        if codes.len() != rows * cols {
            return Err(SimError::RasterFormat(format!(
                "expected {rows}x{cols} = {} values, got {}",
                rows * cols,
                codes.len()
            )));
        }
        let mut unknown = 0;
        let cells = codes
            .iter()
            .map(|&code| {
                CellState::from_code(code).unwrap_or_else(|| {
                    unknown += 1;
                    CellState::NoForest
                })
            })
            .collect();
        Ok((Self { rows, cols, cells }, unknown))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn in_bounds(&self, row: i64, col: i64) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<CellState> {
        if row < self.rows && col < self.cols {
            Some(self.cells[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn set(&mut self, row: usize, col: usize, state: CellState) {
        if row < self.rows && col < self.cols {
            self.cells[row * self.cols + col] = state;
        }
    }

    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [CellState] {
        &mut self.cells
    }

    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|&&c| c == state).count()
    }

    pub fn burning_count(&self) -> usize {
        self.count(CellState::Burning)
    }

    /// Class values of a window, row-major
    pub fn window_codes(&self, window: &CropWindow) -> Vec<u8> {
        let mut out = Vec::with_capacity(window.height * window.width);
        for row in window.row_off..window.row_off + window.height {
            let start = row * self.cols + window.col_off;
            out.extend(self.cells[start..start + window.width].iter().map(|c| c.code()));
        }
        out
    }
}

/// Rectangular sub-extent of a grid that gets written to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropWindow {
    pub row_off: usize,
    pub col_off: usize,
    pub height: usize,
    pub width: usize,
}

impl CropWindow {
    /// The whole grid
    pub fn full(rows: usize, cols: usize) -> Self {
        Self {
            row_off: 0,
            col_off: 0,
            height: rows,
            width: cols,
        }
    }

    /// `[max(0, p - buffer), min(extent, p + buffer))` in both axes
    pub fn around(row: usize, col: usize, buffer: usize, rows: usize, cols: usize) -> Self {
        let row_off = row.saturating_sub(buffer);
        let col_off = col.saturating_sub(buffer);
        let row_end = row.saturating_add(buffer).min(rows);
        let col_end = col.saturating_add(buffer).min(cols);
        Self {
            row_off,
            col_off,
            height: row_end.saturating_sub(row_off),
            width: col_end.saturating_sub(col_off),
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.row_off..self.row_off + self.height).contains(&row)
            && (self.col_off..self.col_off + self.width).contains(&col)
    }
}

/// A land-cover grid with its georeference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRaster {
    pub grid: StateGrid,
    pub georef: GeoReference,
}

impl ClassifiedRaster {
    pub fn new(grid: StateGrid, georef: GeoReference) -> Self {
        Self { grid, georef }
    }

    /// Read a single-band `GeoTIFF`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let read_err = |e: &dyn std::fmt::Display| SimError::RasterRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        let file = File::open(path).map_err(|e| read_err(&e))?;
        let raster = Self::decode(BufReader::new(file)).map_err(|e| match e {
            SimError::TiffEncode(inner) => read_err(&inner),
            other => other,
        })?;
        info!(
            "Loaded raster {} ({}x{}, EPSG {:?})",
            path.display(),
            raster.grid.rows(),
            raster.grid.cols(),
            raster.georef.epsg()
        );
        Ok(raster)
    }

    fn decode<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());
        let (width, height) = decoder.dimensions()?;
        match decoder.colortype()? {
            ColorType::Gray(_) => {}
            other => {
                return Err(SimError::RasterFormat(format!(
                    "expected a single-band raster, got {other:?}"
                )))
            }
        }

        let georef = read_georeference(&mut decoder)?;
        let codes = classify(decoder.read_image()?)?;
        let (grid, unknown) = StateGrid::from_codes(height as usize, width as usize, &codes)?;
        if unknown > 0 {
            warn!("{} raster cells had unknown class values; treated as no forest", unknown);
        }
        Ok(Self { grid, georef })
    }

    /// `(row, col)` of a geographic coordinate, possibly outside the grid
    pub fn pixel_for_coordinate(&self, lat: f64, lon: f64) -> Result<(i64, i64)> {
        self.georef
            .pixel_of_lat_lon(lat, lon)
            .ok_or_else(|| SimError::RasterFormat("raster transform is not invertible".into()))
    }

    /// Resolve and validate the ignition pixel
    pub fn resolve_ignition(&self, ignition: &RasterIgnition, rng: &mut SimRng) -> Result<(usize, usize)> {
        let (row, col) = match *ignition {
            RasterIgnition::Coordinate { lat, lon } => {
                let pixel = self.pixel_for_coordinate(lat, lon)?;
                debug!("Ignition ({}, {}) maps to pixel {:?}", lat, lon, pixel);
                pixel
            }
            RasterIgnition::Pixel { row, col } => (row, col),
            RasterIgnition::Random => {
                let forest: Vec<usize> = self
                    .grid
                    .cells()
                    .iter()
                    .enumerate()
                    .filter(|(_, &c)| c == CellState::Forest)
                    .map(|(i, _)| i)
                    .collect();
                let idx = rng.index(forest.len()).ok_or(SimError::NoIgnitableNodes)?;
                let cell = forest[idx];
                return Ok((cell / self.grid.cols(), cell % self.grid.cols()));
            }
        };

        if !self.grid.in_bounds(row, col) {
            return Err(SimError::IgnitionOutOfBounds {
                row,
                col,
                height: self.grid.rows(),
                width: self.grid.cols(),
            });
        }
        let (row, col) = (row as usize, col as usize);
        match self.grid.get(row, col) {
            Some(CellState::Forest) => Ok((row, col)),
            other => Err(SimError::InvalidIgnitionPoint {
                row,
                col,
                value: other.map_or(0, CellState::code),
            }),
        }
    }
}

fn read_georeference<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoReference> {
    let mut find = |code: u16| decoder.find_tag(Tag::from_u16_exhaustive(code));

    let scale = find(TAG_MODEL_PIXEL_SCALE)?.map(Value::into_f64_vec).transpose()?;
    let tiepoint = find(TAG_MODEL_TIEPOINT)?.map(Value::into_f64_vec).transpose()?;
    let matrix = find(TAG_MODEL_TRANSFORMATION)?.map(Value::into_f64_vec).transpose()?;
    let directory = find(TAG_GEO_KEY_DIRECTORY)?.map(Value::into_u16_vec).transpose()?;
    let doubles = find(TAG_GEO_DOUBLE_PARAMS)?.map(Value::into_f64_vec).transpose()?;
    let ascii = find(TAG_GEO_ASCII_PARAMS)?.map(Value::into_string).transpose()?;

    let transform = match (&scale, &tiepoint, &matrix) {
        (Some(s), Some(t), _) => GeoTransform::from_tiepoint(s, t),
        (_, _, Some(m)) => GeoTransform::from_matrix(m),
        _ => None,
    };
    let transform = transform.unwrap_or_else(|| {
        warn!("Raster has no usable georeferencing; using pixel coordinates");
        GeoTransform::IDENTITY
    });

    let keys = directory.map(|directory| GeoKeys {
        directory,
        doubles: doubles.unwrap_or_default(),
        ascii,
    });
    Ok(GeoReference::new(transform, keys))
}

/// Convert decoded samples to class codes; 255 marks anything outside `0..=3`
fn classify(samples: DecodingResult) -> Result<Vec<u8>> {
    fn code(v: f64) -> u8 {
        if v.fract() == 0.0 && (0.0..=3.0).contains(&v) {
            v as u8
        } else {
            u8::MAX
        }
    }
    macro_rules! codes {
        ($values:expr) => {
            $values.into_iter().map(|v| code(v as f64)).collect()
        };
    }
    #[allow(unreachable_patterns)]
    let out: Vec<u8> = match samples {
        DecodingResult::U8(v) => v.into_iter().map(|c| if c <= 3 { c } else { u8::MAX }).collect(),
        DecodingResult::U16(v) => codes!(v),
        DecodingResult::U32(v) => codes!(v),
        DecodingResult::U64(v) => codes!(v),
        DecodingResult::I8(v) => codes!(v),
        DecodingResult::I16(v) => codes!(v),
        DecodingResult::I32(v) => codes!(v),
        DecodingResult::I64(v) => codes!(v),
        DecodingResult::F32(v) => codes!(v),
        DecodingResult::F64(v) => codes!(v),
        _ => return Err(SimError::RasterFormat("unsupported sample format".into())),
    };
    Ok(out)
}
