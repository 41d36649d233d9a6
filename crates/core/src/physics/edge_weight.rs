//! Wind-driven edge weight formula
//!
//! ```text
//! γ = U(0.01, 1) × max_speed × c       c = 1 for strength 0/1, else ε
//! τ = direction × π / 180
//! β = max(2/π × atan(γ cos τ / d), 0.01)     (0.01 when d = 0, rounded to 0.01)
//! ```

use crate::core_types::SimRng;
use crate::physics::threshold::round2;
use std::f64::consts::PI;

/// Weight floor, also used for zero-length edges
pub const MIN_EDGE_WEIGHT: f64 = 0.01;

/// Edge strength: ambient edge created at build time
pub const STRENGTH_AMBIENT: u8 = 0;
/// Edge strength: edge reweighted by a wind gust
pub const STRENGTH_WIND: u8 = 1;

/// Draw the gust speed `γ` for one edge
pub fn sample_gamma(rng: &mut SimRng, max_speed: f64, epsilon: f64, strength: u8) -> f64 {
    let coefficient = if strength <= STRENGTH_WIND { 1.0 } else { epsilon };
    rng.uniform(0.01, 1.0) * max_speed * coefficient
}

/// Deterministic part of the formula for a sampled `γ`
pub fn weight_for(gamma: f64, direction_degrees: f64, distance: f64) -> f64 {
    if distance == 0.0 {
        return MIN_EDGE_WEIGHT;
    }
    let tau = direction_degrees * PI / 180.0;
    let beta = (2.0 / PI * (gamma * tau.cos() / distance).atan()).max(MIN_EDGE_WEIGHT);
    round2(beta)
}

/// Draw `γ` and evaluate the weight of an edge
pub fn edge_weight(
    rng: &mut SimRng,
    max_speed: f64,
    epsilon: f64,
    strength: u8,
    direction_degrees: f64,
    distance: f64,
) -> f64 {
    let gamma = sample_gamma(rng, max_speed, epsilon, strength);
    weight_for(gamma, direction_degrees, distance)
}
