//! Weighted-graph propagation engine
//!
//! One step runs these passes in order:
//!
//! 1. Neighbour ignition: unburnt neighbours of burning nodes accumulate noisy edge
//!    weights from all their burning neighbours (capped at 1) and ignite when the
//!    sum reaches their noisy threshold. Ignitions are applied after the scan.
//! 2. Embers: each node that was burning at the start of the step may loft an ember
//!    onto a random occupied node nearby (or, rarely, anywhere).
//! 3. Decay: burning nodes and active edges lose one lifeline; below zero they burn out.
//! 4. Burning-neighbour counts are refreshed.
//! 5. Edges touching burnt nodes are marked burnt.
//! 6. From the second step on, a wind gust reweights the edges inside an ellipse.

use crate::core_types::{EdgeMarker, FireState, SimRng};
use crate::error::{Result, SimError};
use crate::grid::ForestGraph;
use crate::physics::{apply_wind_gust, WindGust};
use crate::simulation::{GraphConfig, GraphIgnition};
use crate::solver::SpreadModel;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What happened during one graph step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStepStats {
    pub step: u32,
    /// Nodes ignited by neighbour pressure
    pub ignited_by_neighbors: usize,
    /// Nodes ignited by embers
    pub ignited_by_embers: usize,
    /// Nodes that burnt out
    pub burnt_out: usize,
    /// Burning nodes after the step
    pub burning: usize,
    /// Burnt nodes after the step
    pub burnt: usize,
    /// Wind gust applied at the end of the step, if any
    pub gust: Option<WindGust>,
}

/// The weighted-graph engine
#[derive(Debug, Clone, Default)]
pub struct GraphSpread {
    config: GraphConfig,
}

impl GraphSpread {
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Set the starting node on fire and return its id.
    ///
    /// A configured node that cannot burn falls back to a random unburnt node.
    pub fn ignite(&self, graph: &mut ForestGraph, rng: &mut SimRng) -> Result<usize> {
        let chosen = match self.config.ignition {
            GraphIgnition::Node { id } if graph.state(id) == FireState::NotBurnt => Some(id),
            GraphIgnition::Node { id } => {
                warn!(
                    "Configured ignition node {} is not an unburnt node ({:?}); picking a random one",
                    id,
                    graph.state(id)
                );
                None
            }
            GraphIgnition::Random => None,
        };

        let id = match chosen {
            Some(id) => id,
            None => {
                let candidates = graph.ids_in(FireState::NotBurnt);
                let idx = rng.index(candidates.len()).ok_or(SimError::NoIgnitableNodes)?;
                candidates[idx]
            }
        };

        graph.set_state(id, FireState::Burning);
        let (row, col) = graph.id_to_grid(id);
        info!("Ignition at node {} (row {}, col {})", id, row, col);
        Ok(id)
    }

    /// Pressure on `nb` from all its burning neighbours
    fn spread_pressure(&self, graph: &ForestGraph, nb: usize, rng: &mut SimRng) -> f64 {
        let (lo, hi) = self.config.edge_weight_noise;
        let mut s = 0.0_f64;
        for (other, edge) in graph.neighbors(nb) {
            if graph.state(other) != FireState::Burning {
                continue;
            }
            let weight = graph.edge(edge).map_or(0.0, |e| e.weight);
            s = (s + weight * rng.uniform(lo, hi)).min(1.0);
        }
        s
    }

    fn neighbor_pass(&self, graph: &mut ForestGraph, burning: &[usize], rng: &mut SimRng) -> usize {
        let (lo, hi) = self.config.threshold_noise;
        let mut scheduled = Vec::new();
        for &source in burning {
            for (nb, _) in graph.neighbors(source) {
                let Some(node) = graph.node(nb) else { continue };
                if node.state != FireState::NotBurnt {
                    continue;
                }
                let s = self.spread_pressure(graph, nb, rng);
                let threshold = node.threshold * rng.uniform(lo, hi);
                if s >= threshold {
                    scheduled.push((nb, source));
                }
            }
        }

        let mut ignited = FxHashSet::default();
        for (nb, source) in scheduled {
            if !ignited.insert(nb) {
                continue;
            }
            graph.set_state(nb, FireState::Burning);
            if let Some(edge) = graph.edge_between(source, nb).and_then(|e| graph.edge_mut(e)) {
                edge.marker = EdgeMarker::Active;
            }
        }
        ignited.len()
    }

    /// Occupied ids within the ember box around `source`, ascending
    fn ember_candidates(&self, graph: &ForestGraph, source: usize) -> Vec<usize> {
        let last = graph.grid_size().saturating_sub(1);
        let reach = (self.config.ember_radius.floor() as usize).min(last);
        let (row, col) = graph.id_to_grid(source);
        let mut found = Vec::new();
        for c in col.saturating_sub(reach)..=(col + reach).min(last) {
            for r in row.saturating_sub(reach)..=(row + reach).min(last) {
                if let Some(id) = graph.grid_to_id(r, c) {
                    if id != source && graph.state(id).is_occupied() {
                        found.push(id);
                    }
                }
            }
        }
        found
    }

    fn ember_pass(&self, graph: &mut ForestGraph, burning: &[usize], rng: &mut SimRng) -> usize {
        let mut ignited = 0;
        for &source in burning {
            if !rng.chance(self.config.ember_prob) {
                continue;
            }
            let mut candidates = self.ember_candidates(graph, source);
            if candidates.is_empty() && rng.chance(self.config.ember_fallback_prob) {
                candidates = graph.occupied_ids();
                candidates.retain(|&id| id != source);
            }
            let Some(idx) = rng.index(candidates.len()) else {
                continue;
            };
            let target = candidates[idx];
            if rng.chance(self.config.ember_ignition_prob) && graph.state(target) == FireState::NotBurnt {
                graph.set_state(target, FireState::Burning);
                if let Some(edge) = graph.edge_between(source, target).and_then(|e| graph.edge_mut(e)) {
                    edge.marker = EdgeMarker::Active;
                }
                debug!("Ember from node {} ignited node {}", source, target);
                ignited += 1;
            }
        }
        ignited
    }

    fn decay(graph: &mut ForestGraph) -> usize {
        let mut burnt_out = 0;
        for (_, node) in graph.nodes_mut() {
            if node.state == FireState::Burning {
                node.lifeline -= 1;
                if node.lifeline < 0 {
                    node.state = FireState::Burnt;
                    burnt_out += 1;
                }
            }
        }
        for edge in graph.edges_mut() {
            if edge.marker == EdgeMarker::Active {
                edge.lifeline -= 1;
                if edge.lifeline < 0 {
                    edge.marker = EdgeMarker::Burnt;
                }
            }
        }
        burnt_out
    }

    fn refresh_neighbor_counts(graph: &mut ForestGraph) {
        let counts: Vec<usize> = graph
            .ids()
            .map(|id| {
                graph
                    .neighbors(id)
                    .filter(|&(nb, _)| graph.state(nb) == FireState::Burning)
                    .count()
            })
            .collect();
        for ((_, node), count) in graph.nodes_mut().zip(counts) {
            node.active_neighbors = count;
        }
    }

    fn mark_burnt_edges(graph: &mut ForestGraph) {
        let burnt: Vec<usize> = graph
            .edges()
            .iter()
            .enumerate()
            .filter(|(_, e)| graph.state(e.a) == FireState::Burnt || graph.state(e.b) == FireState::Burnt)
            .map(|(idx, _)| idx)
            .collect();
        for idx in burnt {
            if let Some(edge) = graph.edge_mut(idx) {
                edge.marker = EdgeMarker::Burnt;
            }
        }
    }
}

impl SpreadModel for GraphSpread {
    type State = ForestGraph;
    type Stats = GraphStepStats;

    fn name(&self) -> &'static str {
        "graph"
    }

    fn advance(&self, graph: &mut ForestGraph, step: u32, rng: &mut SimRng) -> GraphStepStats {
        let burning = graph.ids_in(FireState::Burning);

        let ignited_by_neighbors = self.neighbor_pass(graph, &burning, rng);
        let ignited_by_embers = self.ember_pass(graph, &burning, rng);
        let burnt_out = Self::decay(graph);
        Self::refresh_neighbor_counts(graph);
        Self::mark_burnt_edges(graph);

        let gust = if step > 1 {
            apply_wind_gust(graph, &self.config, rng)
        } else {
            None
        };

        let stats = GraphStepStats {
            step,
            ignited_by_neighbors,
            ignited_by_embers,
            burnt_out,
            burning: graph.burning_count(),
            burnt: graph.count(FireState::Burnt),
            gust,
        };
        debug!(
            "Step {}: +{} neighbour, +{} ember, {} burnt out; burning {}, burnt {}",
            step, ignited_by_neighbors, ignited_by_embers, burnt_out, stats.burning, stats.burnt
        );
        stats
    }

    fn burning(&self, graph: &ForestGraph) -> usize {
        graph.burning_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{build_forest_graph, Edge, Node, TerrainSample, TerrainTable};

    fn node(state: FireState, threshold: f64, lifeline: i32) -> Node {
        Node {
            state,
            threshold,
            lifeline,
            active_neighbors: 0,
        }
    }

    fn edge(a: usize, b: usize, weight: f64, lifeline: i32) -> Edge {
        Edge {
            a,
            b,
            weight,
            lifeline,
            wind_direction: 0.0,
            strength: 0,
            marker: EdgeMarker::Base,
        }
    }

    fn quiet_config() -> GraphConfig {
        GraphConfig {
            ember_prob: 0.0,
            ..Default::default()
        }
    }

    /// Three nodes in a column: 1 burning, 2 and 3 unburnt, chain 1-2-3
    fn chain(threshold: f64, weight: f64) -> ForestGraph {
        let mut g = ForestGraph::with_layout(
            3,
            vec![
                node(FireState::Burning, threshold, 2),
                node(FireState::NotBurnt, threshold, 2),
                node(FireState::NotBurnt, threshold, 2),
            ],
        );
        g.add_edge(edge(1, 2, weight, 2));
        g.add_edge(edge(2, 3, weight, 2));
        g
    }

    #[test]
    fn test_one_hop_per_step() {
        // Weight 1.0 always beats a zero threshold
        let mut g = chain(0.0, 1.0);
        let model = GraphSpread::new(quiet_config());
        let mut rng = SimRng::from_seed_u64(1);

        let stats = model.advance(&mut g, 1, &mut rng);
        assert_eq!(stats.ignited_by_neighbors, 1);
        assert_eq!(g.state(2), FireState::Burning);
        assert_eq!(g.state(3), FireState::NotBurnt);
        assert_eq!(g.edges()[0].marker, EdgeMarker::Active);
        assert_eq!(g.node(2).unwrap().active_neighbors, 1);
        assert_eq!(g.node(3).unwrap().active_neighbors, 1);
    }

    #[test]
    fn test_high_threshold_blocks_spread() {
        // Pressure is capped at 1 while the threshold stays above 0.6 · 2
        let mut g = chain(2.0, 1.0);
        let model = GraphSpread::new(quiet_config());
        let stats = model.advance(&mut g, 1, &mut SimRng::from_seed_u64(2));
        assert_eq!(stats.ignited_by_neighbors, 0);
        assert_eq!(g.state(2), FireState::NotBurnt);
    }

    #[test]
    fn test_lifeline_burns_out() {
        let mut g = chain(2.0, 1.0);
        let model = GraphSpread::new(quiet_config());
        let mut rng = SimRng::from_seed_u64(3);

        // Lifeline 2 -> 1 -> 0 -> -1: burnt after the third step
        for step in 1..=2 {
            model.advance(&mut g, step, &mut rng);
            assert_eq!(g.state(1), FireState::Burning);
        }
        let stats = model.advance(&mut g, 3, &mut rng);
        assert_eq!(stats.burnt_out, 1);
        assert_eq!(g.state(1), FireState::Burnt);
        assert_eq!(g.edges()[0].marker, EdgeMarker::Burnt);
        assert_eq!(model.burning(&g), 0);
    }

    #[test]
    fn test_active_edge_decays() {
        let mut g = chain(0.0, 1.0);
        g.node_mut(1).unwrap().lifeline = 10;
        g.node_mut(2).unwrap().lifeline = 10;
        g.node_mut(3).unwrap().state = FireState::Empty;
        g.edge_mut(0).unwrap().lifeline = 0;
        let model = GraphSpread::new(quiet_config());

        // Activated and decremented in the same step: 0 -> -1
        model.advance(&mut g, 1, &mut SimRng::from_seed_u64(4));
        assert_eq!(g.edges()[0].marker, EdgeMarker::Burnt);
    }

    #[test]
    fn test_ember_ignites_distant_node() {
        // Nodes 1 and 3 share no edge; an ember is the only way across
        let mut g = ForestGraph::with_layout(
            3,
            vec![
                node(FireState::Burning, 1.0, 5),
                node(FireState::Empty, 1.0, 5),
                node(FireState::NotBurnt, 1.0, 5),
            ],
        );
        let model = GraphSpread::new(GraphConfig {
            ember_prob: 1.0,
            ember_ignition_prob: 1.0,
            ..Default::default()
        });
        let stats = model.advance(&mut g, 1, &mut SimRng::from_seed_u64(5));
        assert_eq!(stats.ignited_by_embers, 1);
        assert_eq!(g.state(3), FireState::Burning);
        assert_eq!(g.state(2), FireState::Empty);
    }

    #[test]
    fn test_ignite_falls_back_to_random() {
        let mut g = chain(0.1, 0.5);
        let model = GraphSpread::new(GraphConfig {
            ignition: GraphIgnition::Node { id: 1 },
            ..Default::default()
        });
        // Node 1 is already burning, so a random unburnt node is chosen instead
        let id = model.ignite(&mut g, &mut SimRng::from_seed_u64(6)).unwrap();
        assert!(id == 2 || id == 3);
        assert_eq!(g.burning_count(), 2);

        let model = GraphSpread::new(GraphConfig {
            ignition: GraphIgnition::Node { id: 3 },
            ..Default::default()
        });
        let mut g = chain(0.1, 0.5);
        assert_eq!(model.ignite(&mut g, &mut SimRng::from_seed_u64(6)).unwrap(), 3);
    }

    #[test]
    fn test_states_only_move_forward() {
        let cfg = GraphConfig {
            node_count: 225,
            density_factor: 0.9,
            ember_prob: 0.2,
            ..Default::default()
        };
        let terrain =
            TerrainTable::from_samples((0..225).map(|i| TerrainSample::new(f64::from(i % 30), 2000.0 + f64::from(i), 90.0)).collect())
                .unwrap();
        let mut rng = SimRng::from_seed_u64(42);
        let mut g = build_forest_graph(&terrain, None, &cfg, &mut rng).unwrap();
        let model = GraphSpread::new(cfg);
        model.ignite(&mut g, &mut rng).unwrap();

        let snapshot = |g: &ForestGraph| -> Vec<(FireState, i32)> {
            g.nodes().map(|(_, n)| (n.state, n.lifeline)).collect()
        };
        let mut previous = snapshot(&g);
        for step in 1..=40 {
            let stats = model.advance(&mut g, step, &mut rng);
            assert_eq!(stats.gust.is_some(), step > 1);
            for ((_, n), &(state, lifeline)) in g.nodes().zip(&previous) {
                assert!(state.can_become(n.state), "{state:?} -> {:?}", n.state);
                assert!(n.lifeline <= lifeline, "lifeline rose from {lifeline} to {}", n.lifeline);
                if state == FireState::Burning {
                    assert_eq!(n.lifeline, lifeline - 1);
                }
                if n.state == FireState::Burning {
                    assert!(n.lifeline >= 0);
                }
            }
            previous = snapshot(&g);
        }
    }

    /// `side`x`side` grid of unburnt nodes without edges, with `burning` on fire
    fn open_grid(side: usize, burning: usize) -> ForestGraph {
        let mut g = ForestGraph::with_layout(side, vec![node(FireState::NotBurnt, 1.0, 50); side * side]);
        g.set_state(burning, FireState::Burning);
        g
    }

    fn ember_config(radius: f64, fallback: f64) -> GraphConfig {
        GraphConfig {
            ember_prob: 1.0,
            ember_ignition_prob: 1.0,
            ember_radius: radius,
            ember_fallback_prob: fallback,
            ..Default::default()
        }
    }

    #[test]
    fn test_ember_lands_inside_its_box() {
        // Centre of a 7x7 grid is (3, 3), id 25
        let model = GraphSpread::new(ember_config(1.0, 1.0));
        for seed in 0..50 {
            let mut g = open_grid(7, 25);
            let stats = model.advance(&mut g, 1, &mut SimRng::from_seed_u64(seed));
            assert_eq!(stats.ignited_by_embers, 1);
            for id in g.ids_in(FireState::Burning) {
                let (row, col) = g.id_to_grid(id);
                assert!(row.abs_diff(3) <= 1 && col.abs_diff(3) <= 1, "ember landed at ({row}, {col})");
            }
        }
    }

    #[test]
    fn test_ember_radius_larger_than_grid() {
        for radius in [1e30, f64::INFINITY] {
            let model = GraphSpread::new(ember_config(radius, 0.0));
            let mut g = open_grid(3, 5);
            let stats = model.advance(&mut g, 1, &mut SimRng::from_seed_u64(9));
            assert_eq!(stats.ignited_by_embers, 1);
            assert_eq!(g.burning_count(), 2);
        }
    }

    /// Burning corner node 1 and a single unburnt node 25 far outside the ember box
    fn isolated_pair() -> ForestGraph {
        let mut g = open_grid(5, 1);
        for id in 2..25 {
            g.set_state(id, FireState::Empty);
        }
        g
    }

    #[test]
    fn test_ember_falls_back_to_whole_domain() {
        let model = GraphSpread::new(ember_config(1.0, 1.0));
        let mut g = isolated_pair();
        let stats = model.advance(&mut g, 1, &mut SimRng::from_seed_u64(11));
        assert_eq!(stats.ignited_by_embers, 1);
        assert_eq!(g.state(25), FireState::Burning);
    }

    #[test]
    fn test_ember_without_fallback_goes_nowhere() {
        let model = GraphSpread::new(ember_config(1.0, 0.0));
        for seed in 0..20 {
            let mut g = isolated_pair();
            let stats = model.advance(&mut g, 1, &mut SimRng::from_seed_u64(seed));
            assert_eq!(stats.ignited_by_embers, 0);
            assert_eq!(g.state(25), FireState::NotBurnt);
        }
    }
}
