//! Georeferenced raster snapshots
//!
//! Writes a single-band `u8` `GeoTIFF` of the crop window, LZW-compressed, carrying the
//! input raster's CRS keys and a transform shifted to the window's origin.

use super::SnapshotWriter;
use crate::error::Result;
use crate::grid::raster::{
    TAG_GEO_ASCII_PARAMS, TAG_GEO_DOUBLE_PARAMS, TAG_GEO_KEY_DIRECTORY, TAG_MODEL_PIXEL_SCALE,
    TAG_MODEL_TIEPOINT, TAG_MODEL_TRANSFORMATION,
};
use crate::grid::{CropWindow, GeoReference, StateGrid};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tiff::encoder::{colortype, compression::Lzw, TiffEncoder};
use tiff::tags::Tag;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct GeoTiffSnapshotWriter {
    /// Georeference of the full grid
    georef: GeoReference,
    window: Option<CropWindow>,
}

impl GeoTiffSnapshotWriter {
    /// Writer for the whole grid (`window = None`) or a sub-window of it
    pub fn new(georef: GeoReference, window: Option<CropWindow>) -> Self {
        Self { georef, window }
    }

    pub fn window(&self) -> Option<CropWindow> {
        self.window
    }

    /// The configured window clipped to the grid
    fn effective_window(&self, grid: &StateGrid) -> CropWindow {
        let (rows, cols) = grid.shape();
        let Some(w) = self.window else {
            return CropWindow::full(rows, cols);
        };
        let row_off = w.row_off.min(rows);
        let col_off = w.col_off.min(cols);
        let clipped = CropWindow {
            row_off,
            col_off,
            height: w.height.min(rows - row_off),
            width: w.width.min(cols - col_off),
        };
        if clipped != w {
            warn!("Crop window {:?} exceeds the {}x{} grid; clipped to {:?}", w, rows, cols, clipped);
        }
        clipped
    }
}

impl SnapshotWriter<StateGrid> for GeoTiffSnapshotWriter {
    fn file_name(&self, step: u32) -> String {
        format!("wildfire_t_{step:03}.tif")
    }

    fn write(&self, grid: &StateGrid, step: u32, dir: &Path) -> Result<PathBuf> {
        let window = self.effective_window(grid);
        let georef = self.georef.window(window.row_off, window.col_off);
        let codes = grid.window_codes(&window);

        let path = dir.join(self.file_name(step));
        let mut tiff = TiffEncoder::new(BufWriter::new(File::create(&path)?))?;
        let mut image = tiff.new_image_with_compression::<colortype::Gray8, _>(
            window.width as u32,
            window.height as u32,
            Lzw::default(),
        )?;

        let dir_enc = image.encoder();
        let tag = Tag::from_u16_exhaustive;
        if georef.transform.is_north_up() {
            let (scale, tiepoint) = georef.transform.to_tiepoint();
            dir_enc.write_tag(tag(TAG_MODEL_PIXEL_SCALE), &scale[..])?;
            dir_enc.write_tag(tag(TAG_MODEL_TIEPOINT), &tiepoint[..])?;
        } else {
            dir_enc.write_tag(tag(TAG_MODEL_TRANSFORMATION), &georef.transform.to_matrix()[..])?;
        }
        if let Some(keys) = &georef.keys {
            dir_enc.write_tag(tag(TAG_GEO_KEY_DIRECTORY), &keys.directory[..])?;
            if !keys.doubles.is_empty() {
                dir_enc.write_tag(tag(TAG_GEO_DOUBLE_PARAMS), &keys.doubles[..])?;
            }
            if let Some(ascii) = &keys.ascii {
                dir_enc.write_tag(tag(TAG_GEO_ASCII_PARAMS), ascii.as_str())?;
            }
        }

        image.write_data(&codes)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::CellState;
    use crate::grid::{ClassifiedRaster, GeoKeys, GeoTransform};

    fn georef() -> GeoReference {
        let transform = GeoTransform::from_tiepoint(&[30.0, 30.0, 0.0], &[0.0, 0.0, 0.0, 1000.0, 9000.0, 0.0]).unwrap();
        GeoReference::new(transform, Some(GeoKeys::for_epsg(3857)))
    }

    #[test]
    fn test_full_grid_round_trip() {
        let mut grid = StateGrid::filled(4, 6, CellState::Forest);
        grid.set(1, 2, CellState::Burning);
        grid.set(3, 5, CellState::Burnt);
        let dir = tempfile::tempdir().unwrap();
        let writer = GeoTiffSnapshotWriter::new(georef(), None);

        let path = writer.write(&grid, 3, dir.path()).unwrap();
        assert!(path.ends_with("wildfire_t_003.tif"));

        let back = ClassifiedRaster::open(&path).unwrap();
        assert_eq!(back.grid, grid);
        assert_eq!(back.georef, georef());
        assert_eq!(back.georef.epsg(), Some(3857));
    }

    #[test]
    fn test_cropped_output_is_georeferenced() {
        let mut grid = StateGrid::filled(10, 10, CellState::NoForest);
        grid.set(5, 5, CellState::Burning);
        let window = CropWindow::around(5, 5, 2, 10, 10);
        let writer = GeoTiffSnapshotWriter::new(georef(), Some(window));
        let dir = tempfile::tempdir().unwrap();

        let path = writer.write(&grid, 0, dir.path()).unwrap();
        let back = ClassifiedRaster::open(&path).unwrap();
        assert_eq!(back.grid.shape(), (4, 4));
        assert_eq!(back.grid.get(2, 2), Some(CellState::Burning));

        // The same map point resolves to the same cell in both georeferences
        let (x, y) = georef().transform.apply(5.5, 5.5);
        assert_eq!(back.georef.transform.pixel_of(x, y), Some((2, 2)));
    }

    #[test]
    fn test_oversized_window_is_clipped() {
        let grid = StateGrid::filled(3, 3, CellState::Forest);
        let window = CropWindow {
            row_off: 1,
            col_off: 1,
            height: 10,
            width: 10,
        };
        let writer = GeoTiffSnapshotWriter::new(georef(), Some(window));
        let dir = tempfile::tempdir().unwrap();
        let path = writer.write(&grid, 1, dir.path()).unwrap();
        assert_eq!(ClassifiedRaster::open(path).unwrap().grid.shape(), (2, 2));
    }
}
