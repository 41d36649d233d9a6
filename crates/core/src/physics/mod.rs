//! Terrain and wind physics for the graph engine
//!
//! Pure functions: ignition thresholds from terrain covariates, the wind-driven edge
//! weight formula, and elliptical wind gusts that reweight edges in place.

pub mod edge_weight;
pub mod threshold;
pub mod wind;

pub use edge_weight::{edge_weight, sample_gamma, weight_for, MIN_EDGE_WEIGHT, STRENGTH_AMBIENT, STRENGTH_WIND};
pub use threshold::{ignition_threshold, Octant};
pub use wind::{apply_wind_gust, GustAxis, WindGust};
