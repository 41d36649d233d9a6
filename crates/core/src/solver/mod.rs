//! Fire-spread engines
//!
//! The core abstraction is the [`SpreadModel`] trait, implemented by the
//! weighted-graph engine ([`GraphSpread`]) and the raster cellular automaton
//! ([`RasterSpread`]). The simulation driver selects one per run.

mod graph_spread;
mod raster_spread;
#[allow(clippy::module_name_repetitions)]
mod r#trait;

// Re-exports
pub use graph_spread::{GraphSpread, GraphStepStats};
pub use r#trait::SpreadModel;
pub use raster_spread::{burning_neighbor_counts, RasterSpread, RasterStepStats};
