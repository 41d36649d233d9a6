//! Georeferencing for classified rasters
//!
//! Affine pixel↔map transforms (GDAL/rasterio convention, `(col, row)` to `(x, y)`),
//! the `GeoTIFF` key directory, and the spherical Web Mercator projection used when a
//! raster is stored in EPSG:3857.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Sphere radius used by EPSG:3857
pub const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// EPSG code of spherical Web Mercator
pub const EPSG_WEB_MERCATOR: u16 = 3857;

/// `GeoKey` ids that carry a CRS code
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// `x = a·col + b·row + c`, `y = d·col + e·row + f`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 0.0,
        e: 1.0,
        f: 0.0,
    };

    /// North-up transform from `ModelPixelScale` and the first `ModelTiepoint`
    /// (`[i, j, k, x, y, z]`)
    pub fn from_tiepoint(scale: &[f64], tiepoint: &[f64]) -> Option<Self> {
        if scale.len() < 2 || tiepoint.len() < 6 {
            return None;
        }
        let (sx, sy) = (scale[0], scale[1]);
        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
        Some(Self {
            a: sx,
            b: 0.0,
            c: x - i * sx,
            d: 0.0,
            e: -sy,
            f: y + j * sy,
        })
    }

    /// From a row-major 4×4 `ModelTransformation` matrix
    pub fn from_matrix(m: &[f64]) -> Option<Self> {
        if m.len() < 16 {
            return None;
        }
        Some(Self {
            a: m[0],
            b: m[1],
            c: m[3],
            d: m[4],
            e: m[5],
            f: m[7],
        })
    }

    /// Map coordinates of a fractional pixel position
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Fractional `(col, row)` of a map coordinate; `None` for a singular transform
    pub fn invert(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.a * self.e - self.b * self.d;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let (dx, dy) = (x - self.c, y - self.f);
        let col = (self.e * dx - self.b * dy) / det;
        let row = (-self.d * dx + self.a * dy) / det;
        Some((col, row))
    }

    /// Integer `(row, col)` containing a map coordinate, possibly outside the raster
    pub fn pixel_of(&self, x: f64, y: f64) -> Option<(i64, i64)> {
        let (col, row) = self.invert(x, y)?;
        if !(col.is_finite() && row.is_finite()) {
            return None;
        }
        Some((row.floor() as i64, col.floor() as i64))
    }

    /// Transform of a sub-window whose top-left pixel is `(row_off, col_off)`
    pub fn window(&self, row_off: usize, col_off: usize) -> Self {
        let (x, y) = self.apply(col_off as f64, row_off as f64);
        Self { c: x, f: y, ..*self }
    }

    /// Whether the transform has no rotation terms
    pub fn is_north_up(&self) -> bool {
        self.b == 0.0 && self.d == 0.0
    }

    /// `ModelPixelScale` and `ModelTiepoint` values for a north-up transform
    pub fn to_tiepoint(&self) -> ([f64; 3], [f64; 6]) {
        ([self.a, -self.e, 0.0], [0.0, 0.0, 0.0, self.c, self.f, 0.0])
    }

    /// Row-major 4×4 `ModelTransformation` matrix
    pub fn to_matrix(&self) -> [f64; 16] {
        [
            self.a, self.b, 0.0, self.c, //
            self.d, self.e, 0.0, self.f, //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// `GeoTIFF` key directory plus its double and ASCII parameter blocks, kept verbatim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoKeys {
    pub directory: Vec<u16>,
    pub doubles: Vec<f64>,
    pub ascii: Option<String>,
}

impl GeoKeys {
    /// Minimal directory naming a CRS by EPSG code
    pub fn for_epsg(code: u16) -> Self {
        let (model, key) = if code == 4326 || (4000..5000).contains(&code) {
            (2, GEOGRAPHIC_TYPE_KEY)
        } else {
            (1, PROJECTED_CS_TYPE_KEY)
        };
        Self {
            // version 1.1.0, 3 keys: GTModelType, GTRasterType (PixelIsArea), CRS
            directory: vec![1, 1, 0, 3, 1024, 0, 1, model, 1025, 0, 1, 1, key, 0, 1, code],
            doubles: Vec::new(),
            ascii: None,
        }
    }

    fn key_value(&self, key: u16) -> Option<u16> {
        let count = usize::from(*self.directory.get(3)?);
        self.directory
            .get(4..)?
            .chunks_exact(4)
            .take(count)
            .find(|entry| entry[0] == key && entry[1] == 0)
            .map(|entry| entry[3])
    }

    /// EPSG code of the projected CRS, or the geographic CRS if not projected
    pub fn epsg(&self) -> Option<u16> {
        self.key_value(PROJECTED_CS_TYPE_KEY)
            .or_else(|| self.key_value(GEOGRAPHIC_TYPE_KEY))
            .filter(|&code| code != 0 && code != 32767)
    }
}

/// Where a raster sits on the earth
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoReference {
    pub transform: GeoTransform,
    pub keys: Option<GeoKeys>,
}

impl GeoReference {
    pub fn new(transform: GeoTransform, keys: Option<GeoKeys>) -> Self {
        Self { transform, keys }
    }

    pub fn epsg(&self) -> Option<u16> {
        self.keys.as_ref().and_then(GeoKeys::epsg)
    }

    /// Map coordinates of a geographic point in this raster's CRS
    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        if self.epsg() == Some(EPSG_WEB_MERCATOR) {
            lonlat_to_web_mercator(lon, lat)
        } else {
            (lon, lat)
        }
    }

    /// Integer `(row, col)` of a geographic point, possibly outside the raster
    pub fn pixel_of_lat_lon(&self, lat: f64, lon: f64) -> Option<(i64, i64)> {
        let (x, y) = self.project(lat, lon);
        self.transform.pixel_of(x, y)
    }

    /// Same CRS, transform shifted to a sub-window
    pub fn window(&self, row_off: usize, col_off: usize) -> Self {
        Self {
            transform: self.transform.window(row_off, col_off),
            keys: self.keys.clone(),
        }
    }
}

/// Spherical Web Mercator `(x, y)` in metres
pub fn lonlat_to_web_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = WEB_MERCATOR_RADIUS * lon.to_radians();
    let y = WEB_MERCATOR_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}
