//! Elliptical wind gusts over the fuel graph
//!
//! Each step after the first, a gust picks a random occupied anchor node and an
//! ellipse around it. Every edge with both endpoints inside the ellipse is reweighted
//! as a wind edge, facing away from a focal node placed along the ellipse's long axis.
//! There is no persistent global wind direction; bias comes from the sequence of gusts.

use crate::core_types::SimRng;
use crate::grid::ForestGraph;
use crate::physics::edge_weight::{edge_weight, STRENGTH_WIND};
use crate::simulation::GraphConfig;
use nalgebra::{distance, Point2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Long axis of a gust ellipse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GustAxis {
    /// Wider than tall; edges point 0° or 180°
    Horizontal,
    /// Taller than wide; edges point 90° or 270°
    Vertical,
}

/// One gust, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindGust {
    /// Node the ellipse is centred on
    pub anchor: usize,
    /// Node the wind direction is measured from
    pub focus: usize,
    /// Semi-axis ratio `(a, b)`, never equal
    pub ratio: (i64, i64),
    /// Semi-axes in simulation units
    pub semi_axes: (f64, f64),
    pub axis: GustAxis,
    /// Edges whose weight was overwritten
    pub reweighted: usize,
}

impl WindGust {
    /// Standard ellipse membership test centred on `center`
    pub fn encloses(&self, center: &Point2<f64>, p: &Point2<f64>) -> bool {
        let (sa, sb) = self.semi_axes;
        let dx = p.x - center.x;
        let dy = p.y - center.y;
        dx * dx / (sa * sa) + dy * dy / (sb * sb) <= 1.0
    }
}

/// Draw a gust and reweight the edges it covers.
///
/// Returns `None` when the graph has no occupied node to anchor on.
pub fn apply_wind_gust(graph: &mut ForestGraph, config: &GraphConfig, rng: &mut SimRng) -> Option<WindGust> {
    let occupied = graph.occupied_ids();
    let anchor = occupied[rng.index(occupied.len())?];

    let (mut a, mut b) = (0, 0);
    while a == b {
        a = rng.int_inclusive(1, config.wind_axis_max);
        b = rng.int_inclusive(1, config.wind_axis_max);
    }
    let c_max = a.max(b) - 1;
    let c = if c_max > 0 {
        rng.int_inclusive(1, c_max) * rng.sign()
    } else {
        0
    };

    let axis = if a > b {
        GustAxis::Horizontal
    } else {
        GustAxis::Vertical
    };
    let unit = graph.cell_scale() * config.wind_axis_scale;
    let mut gust = WindGust {
        anchor,
        focus: anchor,
        ratio: (a, b),
        semi_axes: (a as f64 * unit, b as f64 * unit),
        axis,
        reweighted: 0,
    };

    let center = graph.position(anchor);
    let inside: Vec<bool> = graph
        .nodes()
        .map(|(id, node)| node.state.is_occupied() && gust.encloses(&center, &graph.position(id)))
        .collect();

    let offset = match axis {
        GustAxis::Horizontal => graph.grid_size() as i64 * c,
        GustAxis::Vertical => c,
    };
    gust.focus = usize::try_from(anchor as i64 + offset)
        .ok()
        .filter(|&f| graph.state(f).is_occupied())
        .unwrap_or(anchor);
    let focus = graph.position(gust.focus);

    let scale = config.dist_scale;
    let mut updates = Vec::new();
    for (idx, edge) in graph.edges().iter().enumerate() {
        if !(inside[edge.a - 1] && inside[edge.b - 1]) {
            continue;
        }
        let (pa, pb) = (graph.position(edge.a), graph.position(edge.b));
        let angle = match axis {
            GustAxis::Horizontal if pa.x > focus.x && pb.x > focus.x => 0.0,
            GustAxis::Horizontal => 180.0,
            GustAxis::Vertical if pa.y > focus.y && pb.y > focus.y => 90.0,
            GustAxis::Vertical => 270.0,
        };
        let weight = edge_weight(
            rng,
            config.max_wind_speed,
            config.wind_epsilon,
            STRENGTH_WIND,
            angle,
            distance(&pa, &pb) * scale,
        );
        updates.push((idx, weight, angle));
    }

    gust.reweighted = updates.len();
    for (idx, weight, angle) in updates {
        if let Some(edge) = graph.edge_mut(idx) {
            edge.weight = weight;
            edge.wind_direction = angle;
            edge.strength = STRENGTH_WIND;
        }
    }

    debug!(
        "Wind gust at node {} (focus {}), ratio {}:{}, {:?}, {} edges reweighted",
        gust.anchor, gust.focus, a, b, gust.axis, gust.reweighted
    );
    Some(gust)
}
