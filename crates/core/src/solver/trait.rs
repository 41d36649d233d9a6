//! Spread model trait definition
//!
//! Both propagation engines advance a state in place, one step at a time, drawing
//! every random number from the run's [`SimRng`]. The simulation driver is generic
//! over this trait so the timestep loop, termination rule and snapshot output are
//! shared.

use crate::core_types::SimRng;
use std::fmt::Debug;

/// One fire-spread strategy
///
/// `advance` must read only the fully materialised state of the previous step;
/// ignitions decided during a step are applied after the scan that decided them.
pub trait SpreadModel {
    /// Spatial state advanced by this model
    type State;

    /// Per-step diagnostics
    type Stats: Debug;

    /// Short engine name used in logs and run reports
    fn name(&self) -> &'static str;

    /// Advance `state` by one step. `step` is the index of the state being produced,
    /// so the first call receives 1.
    fn advance(&self, state: &mut Self::State, step: u32, rng: &mut SimRng) -> Self::Stats;

    /// Number of units currently burning
    fn burning(&self, state: &Self::State) -> usize;
}
