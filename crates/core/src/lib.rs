//! Wildfire Simulation Core Library
//!
//! Stochastic wildfire spread over two kinds of domain:
//!
//! - A weighted forest graph built from a terrain table (slope, elevation, aspect) and an
//!   optional forest boundary. Fire crosses edges whose gamma-sampled weight beats the
//!   target's slope-derived ignition threshold, embers jump gaps, and wind gusts
//!   re-weight the edges inside an elliptical region.
//! - A classified `GeoTIFF` raster driven by a Moore-neighbourhood cellular automaton.
//!
//! Each run writes one snapshot per timestep (PNG for the graph, cropped `GeoTIFF` for the
//! raster) into a fresh output directory and returns a [`RunReport`].

// Core types and utilities
pub mod core_types;
pub mod error;

// Domains, propagation and output
pub mod export;
pub mod grid;
pub mod physics;
pub mod simulation;
pub mod solver;

// Re-export core types
pub use core_types::{CellState, EdgeMarker, FireState, SimRng};
pub use error::{ErrorKind, Result, SimError};

// Re-export domain types
pub use grid::{
    build_forest_graph, ClassifiedRaster, CropWindow, ForestBoundary, ForestGraph, GeoReference, StateGrid,
    TerrainSample, TerrainTable,
};

// Re-export the run surface
pub use export::{GeoTiffSnapshotWriter, PngSnapshotWriter, SnapshotWriter};
pub use simulation::{
    run_graph, run_loop, run_raster, Engine, GraphConfig, GraphIgnition, RasterConfig, RasterIgnition, RunConfig,
    RunReport, RunRequest, StopReason,
};
pub use solver::{GraphSpread, RasterSpread, SpreadModel};
