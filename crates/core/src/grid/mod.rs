//! Spatial domains for both spread engines
//!
//! The graph engine works on a [`ForestGraph`] built from a terrain table and an
//! optional forest boundary. The raster engine works on a [`ClassifiedRaster`] read
//! from a georeferenced land-cover `GeoTIFF`.

pub mod boundary;
pub mod domain_builder;
pub mod forest_graph;
pub mod georef;
pub mod raster;
pub mod terrain;

// Re-export main types
pub use boundary::{BoundaryFit, ForestBoundary};
pub use domain_builder::build_forest_graph;
pub use forest_graph::{id_to_grid, Edge, ForestGraph, Node, DOMAIN_EXTENT};
pub use georef::{lonlat_to_web_mercator, GeoKeys, GeoReference, GeoTransform};
pub use raster::{ClassifiedRaster, CropWindow, StateGrid};
pub use terrain::{TerrainSample, TerrainTable};
