//! Builds the initial fuel graph from a terrain table
//!
//! Nodes are laid out column by column over a square grid. Each node consumes one
//! terrain row for its ignition threshold and draws a random burn lifeline. Occupancy
//! comes from the optional forest boundary first and a density check second.

use crate::core_types::{EdgeMarker, FireState, SimRng};
use crate::error::{Result, SimError};
use crate::grid::boundary::{BoundaryFit, ForestBoundary};
use crate::grid::forest_graph::{position_of, Edge, ForestGraph, Node};
use crate::grid::terrain::TerrainTable;
use crate::physics::edge_weight::{edge_weight, STRENGTH_AMBIENT};
use crate::physics::threshold::ignition_threshold;
use crate::simulation::GraphConfig;
use nalgebra::distance;
use tracing::{debug, info, warn};

/// Threshold stored on empty nodes
const EMPTY_THRESHOLD: f64 = 1.0;

/// Build the fuel graph.
///
/// The terrain table supplies one row per node; if it is shorter than
/// `config.node_count` the node count shrinks to the table length. Fails with
/// [`SimError::NoIgnitableNodes`] when no node ends up unburnt.
pub fn build_forest_graph(
    terrain: &TerrainTable,
    boundary: Option<&ForestBoundary>,
    config: &GraphConfig,
    rng: &mut SimRng,
) -> Result<ForestGraph> {
    config.validate()?;
    if terrain.is_empty() {
        return Err(SimError::EmptyTerrain);
    }

    let node_count = if terrain.len() < config.node_count {
        warn!(
            "Terrain table has fewer rows ({}) than requested nodes ({}). Using {}.",
            terrain.len(),
            config.node_count,
            terrain.len()
        );
        terrain.len()
    } else {
        config.node_count
    };

    let grid_size = ForestGraph::grid_size_for(node_count);
    let cell_scale = crate::grid::DOMAIN_EXTENT / grid_size as f64;
    let elevation_range = terrain.elevation_range(node_count);

    let boundary = boundary.map(|b| match config.boundary_fit {
        BoundaryFit::Domain => b.fitted_to(cell_scale, grid_size as f64 * cell_scale),
        BoundaryFit::Raw => b.clone(),
    });

    let (life_lo, life_hi) = config.lifeline_range;
    let mut nodes = Vec::with_capacity(node_count);
    for (row, sample) in terrain.samples().iter().take(node_count).enumerate() {
        let id = row + 1;
        let theta = ignition_threshold(sample, elevation_range, config.theta_factor);
        let lifeline = rng.int_inclusive(i64::from(life_lo), i64::from(life_hi)) as i32;

        let inside = boundary
            .as_ref()
            .map_or(true, |b| b.contains(&position_of(id, grid_size, cell_scale)));

        let occupied = inside && rng.unit() <= config.density_factor;
        nodes.push(if occupied {
            Node {
                state: FireState::NotBurnt,
                threshold: theta,
                lifeline,
                active_neighbors: 0,
            }
        } else {
            Node {
                state: FireState::Empty,
                threshold: EMPTY_THRESHOLD,
                lifeline,
                active_neighbors: 0,
            }
        });
    }

    let mut graph = ForestGraph::with_layout(grid_size, nodes);
    connect_neighbors(&mut graph, config, rng);

    let unburnt = graph.count(FireState::NotBurnt);
    info!(
        "Built {}x{} fuel graph: {} nodes, {} unburnt, {} edges",
        grid_size,
        grid_size,
        node_count,
        unburnt,
        graph.edges().len()
    );
    if unburnt == 0 {
        warn!("No nodes available to ignite. Forest is empty or all density checks failed.");
        return Err(SimError::NoIgnitableNodes);
    }
    Ok(graph)
}

/// Add an ambient edge between every pair of occupied nodes closer than the
/// proximity radius, in ascending `(a, b)` order.
fn connect_neighbors(graph: &mut ForestGraph, config: &GraphConfig, rng: &mut SimRng) {
    let proximity = config.proximity_factor * graph.cell_scale();
    let last = graph.grid_size().saturating_sub(1);
    let reach = (config.proximity_factor.ceil() as usize).min(last);

    let mut pending = Vec::new();
    for a in graph.ids() {
        if !graph.state(a).is_occupied() {
            continue;
        }
        let (row, col) = graph.id_to_grid(a);
        let pa = graph.position(a);

        let mut candidates: Vec<usize> = (col..=(col + reach).min(last))
            .flat_map(|c| (row.saturating_sub(reach)..=(row + reach).min(last)).map(move |r| (r, c)))
            .filter_map(|(r, c)| graph.grid_to_id(r, c))
            .filter(|&b| b > a && graph.state(b).is_occupied())
            .filter(|&b| distance(&pa, &graph.position(b)) < proximity)
            .collect();
        candidates.sort_unstable();
        pending.extend(candidates.into_iter().map(|b| (a, b)));
    }

    for (a, b) in pending {
        let span = distance(&graph.position(a), &graph.position(b));
        let weight = edge_weight(
            rng,
            config.max_wind_speed,
            config.wind_epsilon,
            STRENGTH_AMBIENT,
            0.0,
            span * config.dist_scale,
        ) * config.base_weight_factor;

        let life_a = graph.node(a).map_or(0, |n| n.lifeline);
        let life_b = graph.node(b).map_or(0, |n| n.lifeline);

        graph.add_edge(Edge {
            a,
            b,
            weight,
            lifeline: (life_a + life_b).div_euclid(2),
            wind_direction: 0.0,
            strength: STRENGTH_AMBIENT,
            marker: EdgeMarker::Base,
        });
    }
    debug!("Connected {} edges within radius {:.3}", graph.edges().len(), proximity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TerrainSample;

    fn flat_terrain(rows: usize) -> TerrainTable {
        TerrainTable::from_samples(vec![TerrainSample::new(0.0, 2500.0, 0.0); rows]).unwrap()
    }

    fn full_density(node_count: usize) -> GraphConfig {
        GraphConfig {
            node_count,
            density_factor: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_proximity_wider_than_grid_links_every_pair() {
        let cfg = GraphConfig {
            proximity_factor: 1e30,
            ..full_density(9)
        };
        let g = build_forest_graph(&flat_terrain(9), None, &cfg, &mut SimRng::from_seed_u64(4)).unwrap();
        assert_eq!(g.grid_size(), 3);
        assert_eq!(g.edges().len(), 9 * 8 / 2);
    }

    #[test]
    fn test_full_density_grid() {
        let mut rng = SimRng::from_seed_u64(1);
        let g = build_forest_graph(&flat_terrain(100), None, &full_density(100), &mut rng).unwrap();

        assert_eq!(g.grid_size(), 10);
        assert_eq!(g.node_count(), 100);
        assert_eq!(g.count(FireState::NotBurnt), 100);
        // 10x10 king-move graph: 2·9·10 orthogonal + 2·9·9 diagonal
        assert_eq!(g.edges().len(), 180 + 162);
        for (_, n) in g.nodes() {
            assert!((3..=7).contains(&n.lifeline));
            assert_eq!(n.threshold, 0.1);
        }
        for e in g.edges() {
            assert!(e.a < e.b);
            assert_eq!(e.marker, EdgeMarker::Base);
            assert_eq!(e.strength, 0);
            let mean = (g.node(e.a).unwrap().lifeline + g.node(e.b).unwrap().lifeline) / 2;
            assert_eq!(e.lifeline, mean);
            assert!(e.weight >= 0.02);
        }
    }

    #[test]
    fn test_short_table_shrinks_node_count() {
        let mut rng = SimRng::from_seed_u64(2);
        let g = build_forest_graph(&flat_terrain(30), None, &full_density(2500), &mut rng).unwrap();
        assert_eq!(g.node_count(), 30);
        assert_eq!(g.grid_size(), 6);
    }

    #[test]
    fn test_zero_density_has_nothing_to_ignite() {
        let mut rng = SimRng::from_seed_u64(3);
        let cfg = GraphConfig {
            node_count: 25,
            density_factor: 0.0,
            ..Default::default()
        };
        let err = build_forest_graph(&flat_terrain(25), None, &cfg, &mut rng).unwrap_err();
        assert!(matches!(err, SimError::NoIgnitableNodes));
    }

    #[test]
    fn test_boundary_empties_outside_nodes() {
        // Left half of the domain only, in raw simulation units
        let boundary = ForestBoundary::from_geojson_str(
            r#"{"type":"Polygon","coordinates":[[[0,0],[50,0],[50,101],[0,101]]]}"#,
        )
        .unwrap();
        let cfg = GraphConfig {
            boundary_fit: BoundaryFit::Raw,
            ..full_density(100)
        };
        let mut rng = SimRng::from_seed_u64(4);
        let g = build_forest_graph(&flat_terrain(100), Some(&boundary), &cfg, &mut rng).unwrap();

        for (id, node) in g.nodes() {
            let inside = g.position(id).x < 50.0;
            assert_eq!(node.state == FireState::NotBurnt, inside, "node {id}");
        }
        for e in g.edges() {
            assert!(g.state(e.a).is_occupied() && g.state(e.b).is_occupied());
        }
    }

    #[test]
    fn test_same_seed_same_graph() {
        let cfg = GraphConfig {
            node_count: 64,
            ..Default::default()
        };
        let a = build_forest_graph(&flat_terrain(64), None, &cfg, &mut SimRng::from_seed_u64(9)).unwrap();
        let b = build_forest_graph(&flat_terrain(64), None, &cfg, &mut SimRng::from_seed_u64(9)).unwrap();
        assert_eq!(a.state_codes(), b.state_codes());
        assert_eq!(a.edges(), b.edges());
    }
}
