//! Core types and utilities

pub mod rng;
pub mod state;

pub use rng::SimRng;
pub use state::{CellState, EdgeMarker, FireState};
