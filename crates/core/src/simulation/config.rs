//! Run configuration for both spread engines
//!
//! All structs deserialize from JSON with every field optional; omitted fields take
//! the documented defaults.

use crate::error::{Result, SimError};
use crate::grid::BoundaryFit;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the graph engine starts its fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum GraphIgnition {
    /// Uniformly random `not_burnt` node
    #[default]
    Random,
    /// A specific 1-based node id. Falls back to random if the node cannot burn.
    Node { id: usize },
}

/// Parameters of the weighted-graph engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Requested node count; the grid side is `ceil(sqrt(node_count))`
    pub node_count: usize,

    /// Probability that a grid position carries fuel
    pub density_factor: f64,

    /// Inclusive range for the initial burn countdown of each node
    pub lifeline_range: (i32, i32),

    /// Global scale on ignition thresholds. Lower values ignite more easily.
    pub theta_factor: f64,

    /// Peak wind speed used by the edge-weight formula
    pub max_wind_speed: f64,

    /// Coefficient applied to edges whose strength is neither ambient nor wind
    pub wind_epsilon: f64,

    /// Multiplier on ambient edge weights at build time
    pub base_weight_factor: f64,

    /// Scale from simulation units to edge-weight distance units
    pub dist_scale: f64,

    /// Edge radius in cell units (1.42 includes diagonal neighbours)
    pub proximity_factor: f64,

    /// Per-burning-node chance to loft an ember each step
    pub ember_prob: f64,

    /// Ember search half-width in grid cells
    pub ember_radius: f64,

    /// Chance to search the whole domain when nothing lies within `ember_radius`
    pub ember_fallback_prob: f64,

    /// Chance that a landed ember ignites unburnt fuel
    pub ember_ignition_prob: f64,

    /// Multiplicative noise range on node thresholds
    pub threshold_noise: (f64, f64),

    /// Multiplicative noise range on contributing edge weights
    pub edge_weight_noise: (f64, f64),

    /// Upper bound for the random wind ellipse semi-axis ratio
    pub wind_axis_max: i64,

    /// Ellipse axis length per unit of ratio, in cells
    pub wind_axis_scale: f64,

    /// Maximum number of steps
    pub timesteps: u32,

    pub ignition: GraphIgnition,

    /// How a supplied forest boundary maps into simulation space
    pub boundary_fit: BoundaryFit,

    /// Side length in pixels of each node in PNG snapshots
    pub snapshot_pixel_scale: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            node_count: 50 * 50,
            density_factor: 0.95,
            lifeline_range: (3, 7),
            theta_factor: 0.2,
            max_wind_speed: 40.0,
            wind_epsilon: 0.1,
            base_weight_factor: 2.0,
            dist_scale: 30.0,
            proximity_factor: 1.42,
            ember_prob: 0.02,
            ember_radius: 5.0,
            ember_fallback_prob: 0.1,
            ember_ignition_prob: 0.5,
            threshold_noise: (0.6, 1.4),
            edge_weight_noise: (0.6, 1.6),
            wind_axis_max: 4,
            wind_axis_scale: 5.0,
            timesteps: 100,
            ignition: GraphIgnition::Random,
            boundary_fit: BoundaryFit::Domain,
            snapshot_pixel_scale: 8,
        }
    }
}

impl GraphConfig {
    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.node_count == 0 {
            return invalid("node_count must be positive");
        }
        for (name, p) in [
            ("density_factor", self.density_factor),
            ("ember_prob", self.ember_prob),
            ("ember_fallback_prob", self.ember_fallback_prob),
            ("ember_ignition_prob", self.ember_ignition_prob),
        ] {
            check_probability(name, p)?;
        }
        // A zero countdown burns out in its ignition step and is never seen burning
        if self.lifeline_range.0 < 1 || self.lifeline_range.0 > self.lifeline_range.1 {
            return invalid("lifeline_range must be an ordered range starting at 1 or more");
        }
        for (name, (lo, hi)) in [
            ("threshold_noise", self.threshold_noise),
            ("edge_weight_noise", self.edge_weight_noise),
        ] {
            if !(lo.is_finite() && hi.is_finite()) || lo < 0.0 || lo > hi {
                return invalid(&format!("{name} must be a non-negative, ordered range"));
            }
        }
        if self.wind_axis_max < 2 {
            return invalid("wind_axis_max must be at least 2 so the ellipse axes can differ");
        }
        for (name, v) in [
            ("dist_scale", self.dist_scale),
            ("proximity_factor", self.proximity_factor),
            ("wind_axis_scale", self.wind_axis_scale),
            ("ember_radius", self.ember_radius),
            ("max_wind_speed", self.max_wind_speed),
        ] {
            if !v.is_finite() {
                return invalid(&format!("{name} must be finite, got {v}"));
            }
        }
        if !(self.dist_scale > 0.0 && self.proximity_factor > 0.0 && self.wind_axis_scale > 0.0) {
            return invalid("dist_scale, proximity_factor and wind_axis_scale must be positive");
        }
        if self.ember_radius < 0.0 || self.max_wind_speed < 0.0 {
            return invalid("ember_radius and max_wind_speed must not be negative");
        }
        if self.snapshot_pixel_scale == 0 {
            return invalid("snapshot_pixel_scale must be positive");
        }
        Ok(())
    }
}

/// Where the raster engine starts its fire
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum RasterIgnition {
    /// Geographic coordinate in degrees
    Coordinate { lat: f64, lon: f64 },
    /// Explicit pixel index
    Pixel { row: i64, col: i64 },
    /// Uniformly random forest pixel
    #[default]
    Random,
}

/// Parameters of the raster cellular automaton
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    pub timesteps: u32,

    /// Chance that forest with at least one burning neighbour ignites
    pub p_ignition: f64,

    /// Chance that forest without burning neighbours ignites
    pub p_spontaneous: f64,

    /// Pixels kept on each side of the ignition pixel in written output;
    /// `None` writes the full grid
    pub crop_buffer: Option<usize>,

    pub ignition: RasterIgnition,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            timesteps: 20,
            p_ignition: 0.40,
            p_spontaneous: 0.0,
            crop_buffer: Some(100),
            ignition: RasterIgnition::Random,
        }
    }
}

impl RasterConfig {
    pub fn validate(&self) -> Result<()> {
        check_probability("p_ignition", self.p_ignition)?;
        check_probability("p_spontaneous", self.p_spontaneous)?;
        if self.crop_buffer == Some(0) {
            return invalid("crop_buffer must be positive when set");
        }
        Ok(())
    }
}

/// Settings shared by every run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Parent directory for run output folders
    pub output_base: PathBuf,

    /// Optional label appended to the run directory name
    pub label: Option<String>,

    /// Fixed seed for reproducible runs; `None` draws one from OS entropy
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_base: PathBuf::from("wildfire_output"),
            label: None,
            seed: None,
        }
    }
}

fn check_probability(name: &str, p: f64) -> Result<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        invalid(&format!("{name} must lie in [0, 1], got {p}"))
    }
}

fn invalid(message: &str) -> Result<()> {
    Err(SimError::InvalidConfig(message.to_string()))
}
