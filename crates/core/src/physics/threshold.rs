//! Terrain-derived ignition thresholds
//!
//! Each graph node resists ignition by a value `θ` computed from slope, normalised
//! elevation and aspect:
//!
//! ```text
//! φ  = tan(slope)            φs = 5.275 φ²
//! h  = (ele - ele_min) / (ele_max - ele_min) × 2300      (0 when flat)
//! h' = h e⁻⁶                 ξ  = 1 / (1 + ln(max(h', 1)))
//! θ  = (-atan(φs ξ α) / π + 0.5) × theta_factor          (rounded to 0.01)
//! ```
//!
//! `α` is a fixed coefficient for the compass octant the slope faces. Lower `θ`
//! means easier ignition.

use crate::grid::TerrainSample;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Elevation span the normalised height is scaled to
const ELEVATION_SPAN: f64 = 2300.0;
/// Slope response coefficient
const SLOPE_COEFFICIENT: f64 = 5.275;

/// Compass octant of a slope aspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Octant {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Octant {
    /// Octant for an aspect in degrees. Boundaries sit at 22.5° + k·45°;
    /// north spans `[337.5, 360) ∪ [0, 22.5)`.
    pub fn from_aspect(degrees: f64) -> Self {
        let a = degrees.rem_euclid(360.0);
        match a {
            a if !(22.5..337.5).contains(&a) => Octant::N,
            a if a < 67.5 => Octant::NE,
            a if a < 112.5 => Octant::E,
            a if a < 157.5 => Octant::SE,
            a if a < 202.5 => Octant::S,
            a if a < 247.5 => Octant::SW,
            a if a < 292.5 => Octant::W,
            _ => Octant::NW,
        }
    }

    /// Aspect coefficient `α`
    pub const fn coefficient(self) -> f64 {
        match self {
            Octant::N => -0.063,
            Octant::NE => 0.349,
            Octant::E => 0.686,
            Octant::SE => 0.557,
            Octant::S => 0.039,
            Octant::SW => -0.155,
            Octant::W => -0.252,
            Octant::NW => -0.171,
        }
    }
}

/// Round to two decimal places
#[inline]
pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Ignition threshold for one terrain sample.
///
/// `elevation_range` is `(min, max)` over the sampled rows.
pub fn ignition_threshold(sample: &TerrainSample, elevation_range: (f64, f64), theta_factor: f64) -> f64 {
    let (ele_min, ele_max) = elevation_range;

    let phi = (sample.slope * PI / 180.0).tan();
    let phi_s = SLOPE_COEFFICIENT * phi * phi;

    let h = if ele_max > ele_min {
        (sample.elevation - ele_min) / (ele_max - ele_min) * ELEVATION_SPAN
    } else {
        0.0
    };
    let h_prime = h * (-6.0_f64).exp();
    let xi = 1.0 / (1.0 + h_prime.max(1.0).ln());

    let alpha = Octant::from_aspect(sample.aspect).coefficient();
    let theta = (-(phi_s * xi * alpha).atan() / PI + 0.5) * theta_factor;
    round2(theta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_octant_boundaries() {
        assert_eq!(Octant::from_aspect(0.0), Octant::N);
        assert_eq!(Octant::from_aspect(22.4), Octant::N);
        assert_eq!(Octant::from_aspect(22.5), Octant::NE);
        assert_eq!(Octant::from_aspect(90.0), Octant::E);
        assert_eq!(Octant::from_aspect(157.5), Octant::S);
        assert_eq!(Octant::from_aspect(300.0), Octant::NW);
        assert_eq!(Octant::from_aspect(337.5), Octant::N);
        assert_eq!(Octant::from_aspect(359.9), Octant::N);
        assert_eq!(Octant::from_aspect(-10.0), Octant::N);
    }

    #[test]
    fn test_flat_ground_is_half_factor() {
        // Zero slope makes the arctan term vanish regardless of aspect
        let sample = TerrainSample::new(0.0, 2500.0, 90.0);
        assert_relative_eq!(ignition_threshold(&sample, (2000.0, 3000.0), 0.2), 0.1);
        assert_relative_eq!(ignition_threshold(&sample, (2000.0, 3000.0), 1.0), 0.5);
    }

    #[test]
    fn test_aspect_direction_matters() {
        // 45° slope, lowest elevation so ξ = 1 and the atan argument is 5.275 α
        let east = TerrainSample::new(45.0, 2000.0, 90.0);
        let west = TerrainSample::new(45.0, 2000.0, 270.0);
        let east_theta = ignition_threshold(&east, (2000.0, 3000.0), 1.0);
        let west_theta = ignition_threshold(&west, (2000.0, 3000.0), 1.0);

        let expected_east = round2(-(5.275_f64 * 0.686).atan() / PI + 0.5);
        assert_relative_eq!(east_theta, expected_east);
        // Positive α lowers the threshold, negative α raises it
        assert!(east_theta < 0.5);
        assert!(west_theta > 0.5);
    }

    #[test]
    fn test_high_elevation_damps_slope() {
        let low = TerrainSample::new(30.0, 2000.0, 90.0);
        let high = TerrainSample::new(30.0, 3000.0, 90.0);
        let range = (2000.0, 3000.0);
        // h' = 2300 e⁻⁶ ≈ 5.7, so ξ < 1 and the slope effect shrinks toward 0.5
        assert!(ignition_threshold(&high, range, 1.0) > ignition_threshold(&low, range, 1.0));
    }

    #[test]
    fn test_degenerate_elevation_range() {
        let sample = TerrainSample::new(10.0, 100.0, 45.0);
        let theta = ignition_threshold(&sample, (100.0, 100.0), 0.2);
        assert!(theta.is_finite());
        assert!((0.0..=0.2).contains(&theta));
    }
}
