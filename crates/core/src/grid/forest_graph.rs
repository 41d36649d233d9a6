//! Graph of fuel nodes on a square grid
//!
//! Node ids are 1-based and assigned column by column: id `k` lives at column
//! `(k - 1) / grid_size` and row `(k - 1) % grid_size`, at position
//! `((col + 1) · cell_scale, (row + 1) · cell_scale)`. Positions are derived from the
//! id, never stored.
//!
//! Edges connect occupied nodes within the proximity radius. They are created once
//! and only their weight, lifeline, wind direction, strength and marker change.

use crate::core_types::{EdgeMarker, FireState};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Side length of the simulated square in simulation units
pub const DOMAIN_EXTENT: f64 = 100.0;

/// A fuel node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub state: FireState,
    /// Resistance to ignition from neighbour pressure
    pub threshold: f64,
    /// Remaining burn steps; the node burns out once this drops below zero
    pub lifeline: i32,
    /// Burning neighbours, refreshed every step
    pub active_neighbors: usize,
}

/// An undirected edge between two occupied nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Lower endpoint id
    pub a: usize,
    /// Higher endpoint id
    pub b: usize,
    /// Propagation strength
    pub weight: f64,
    /// Decays only while `marker == Active`
    pub lifeline: i32,
    /// Degrees
    pub wind_direction: f64,
    /// 0 = ambient, 1 = wind reinforced
    pub strength: u8,
    pub marker: EdgeMarker,
}

impl Edge {
    /// The endpoint that isn't `id`
    pub fn other(&self, id: usize) -> usize {
        if self.a == id {
            self.b
        } else {
            self.a
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Link {
    neighbor: usize,
    edge: usize,
}

/// Node array plus adjacency lists, indexed by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestGraph {
    grid_size: usize,
    cell_scale: f64,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    adjacency: Vec<Vec<Link>>,
}

impl ForestGraph {
    /// Grid side for a node count: `ceil(sqrt(n))`
    pub fn grid_size_for(node_count: usize) -> usize {
        let mut side = (node_count as f64).sqrt().ceil() as usize;
        // Guard against float rounding on perfect squares
        while side > 0 && (side - 1) * (side - 1) >= node_count {
            side -= 1;
        }
        while side * side < node_count {
            side += 1;
        }
        side
    }

    /// Empty graph for `node_count` nodes laid out on a `grid_size` square
    pub(crate) fn with_layout(grid_size: usize, nodes: Vec<Node>) -> Self {
        let n = nodes.len();
        Self {
            grid_size,
            cell_scale: DOMAIN_EXTENT / grid_size.max(1) as f64,
            nodes,
            edges: Vec::new(),
            adjacency: vec![Vec::new(); n],
        }
    }

    pub(crate) fn add_edge(&mut self, edge: Edge) {
        let idx = self.edges.len();
        let (a, b) = (edge.a, edge.b);
        self.adjacency[a - 1].push(Link { neighbor: b, edge: idx });
        self.adjacency[b - 1].push(Link { neighbor: a, edge: idx });
        self.edges.push(edge);
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Spacing between adjacent nodes
    pub fn cell_scale(&self) -> f64 {
        self.cell_scale
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterator over valid ids `1..=node_count`
    pub fn ids(&self) -> std::ops::RangeInclusive<usize> {
        1..=self.nodes.len()
    }

    pub fn contains(&self, id: usize) -> bool {
        (1..=self.nodes.len()).contains(&id)
    }

    pub fn node(&self, id: usize) -> Option<&Node> {
        id.checked_sub(1).and_then(|i| self.nodes.get(i))
    }

    pub fn node_mut(&mut self, id: usize) -> Option<&mut Node> {
        id.checked_sub(1).and_then(|i| self.nodes.get_mut(i))
    }

    /// State of `id`; `Empty` for unknown ids
    pub fn state(&self, id: usize) -> FireState {
        self.node(id).map_or(FireState::Empty, |n| n.state)
    }

    pub(crate) fn set_state(&mut self, id: usize, state: FireState) {
        if let Some(node) = self.node_mut(id) {
            node.state = state;
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = (usize, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (i + 1, n))
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = (usize, &mut Node)> {
        self.nodes.iter_mut().enumerate().map(|(i, n)| (i + 1, n))
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub(crate) fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }

    pub fn edge(&self, index: usize) -> Option<&Edge> {
        self.edges.get(index)
    }

    pub(crate) fn edge_mut(&mut self, index: usize) -> Option<&mut Edge> {
        self.edges.get_mut(index)
    }

    /// `(neighbor id, edge index)` pairs of `id`, in ascending neighbour order
    pub fn neighbors(&self, id: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        id.checked_sub(1)
            .and_then(|i| self.adjacency.get(i))
            .into_iter()
            .flatten()
            .map(|link| (link.neighbor, link.edge))
    }

    /// Index of the edge joining `a` and `b`
    pub fn edge_between(&self, a: usize, b: usize) -> Option<usize> {
        self.neighbors(a).find(|&(n, _)| n == b).map(|(_, e)| e)
    }

    /// `(row, col)` of an id, row 0 at the bottom
    pub fn id_to_grid(&self, id: usize) -> (usize, usize) {
        id_to_grid(id, self.grid_size)
    }

    /// Id at `(row, col)`, if that cell holds a node
    pub fn grid_to_id(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.grid_size || col >= self.grid_size {
            return None;
        }
        let id = col * self.grid_size + row + 1;
        self.contains(id).then_some(id)
    }

    /// Simulation-space position of an id
    pub fn position(&self, id: usize) -> Point2<f64> {
        position_of(id, self.grid_size, self.cell_scale)
    }

    pub fn count(&self, state: FireState) -> usize {
        self.nodes.iter().filter(|n| n.state == state).count()
    }

    pub fn burning_count(&self) -> usize {
        self.count(FireState::Burning)
    }

    /// Ids currently in `state`, ascending
    pub fn ids_in(&self, state: FireState) -> Vec<usize> {
        self.nodes()
            .filter(|(_, n)| n.state == state)
            .map(|(id, _)| id)
            .collect()
    }

    /// Ids of every node that carries fuel, ascending
    pub fn occupied_ids(&self) -> Vec<usize> {
        self.nodes()
            .filter(|(_, n)| n.state.is_occupied())
            .map(|(id, _)| id)
            .collect()
    }

    /// Node states as a `grid_size × grid_size` row-major raster of palette codes,
    /// row 0 at the bottom. Cells without a node stay 0.
    pub fn state_codes(&self) -> Vec<u8> {
        let mut codes = vec![0_u8; self.grid_size * self.grid_size];
        for (id, node) in self.nodes() {
            let (row, col) = self.id_to_grid(id);
            codes[row * self.grid_size + col] = node.state.code();
        }
        codes
    }
}

/// `(row, col)` for a 1-based id in column-major order
pub fn id_to_grid(id: usize, grid_size: usize) -> (usize, usize) {
    let k = id.saturating_sub(1);
    let side = grid_size.max(1);
    (k % side, k / side)
}

pub(crate) fn position_of(id: usize, grid_size: usize, cell_scale: f64) -> Point2<f64> {
    let (row, col) = id_to_grid(id, grid_size);
    Point2::new((col + 1) as f64 * cell_scale, (row + 1) as f64 * cell_scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(state: FireState) -> Node {
        Node {
            state,
            threshold: 0.1,
            lifeline: 3,
            active_neighbors: 0,
        }
    }

    #[test]
    fn test_grid_size() {
        assert_eq!(ForestGraph::grid_size_for(2500), 50);
        assert_eq!(ForestGraph::grid_size_for(2501), 51);
        assert_eq!(ForestGraph::grid_size_for(100), 10);
        assert_eq!(ForestGraph::grid_size_for(1), 1);
        assert_eq!(ForestGraph::grid_size_for(10), 4);
    }

    #[test]
    fn test_column_major_ids() {
        assert_eq!(id_to_grid(1, 10), (0, 0));
        assert_eq!(id_to_grid(10, 10), (9, 0));
        assert_eq!(id_to_grid(11, 10), (0, 1));
        assert_eq!(id_to_grid(50, 10), (9, 4));

        let p = position_of(11, 10, 10.0);
        assert_eq!((p.x, p.y), (20.0, 10.0));
    }

    #[test]
    fn test_adjacency() {
        let mut g = ForestGraph::with_layout(2, vec![node(FireState::NotBurnt); 4]);
        g.add_edge(Edge {
            a: 1,
            b: 3,
            weight: 0.3,
            lifeline: 4,
            wind_direction: 0.0,
            strength: 0,
            marker: EdgeMarker::Base,
        });

        assert_eq!(g.edge_between(1, 3), Some(0));
        assert_eq!(g.edge_between(3, 1), Some(0));
        assert_eq!(g.edge_between(1, 2), None);
        assert_eq!(g.neighbors(3).collect::<Vec<_>>(), vec![(1, 0)]);
        assert_eq!(g.neighbors(99).count(), 0);
        assert_eq!(g.edges()[0].other(3), 1);
    }

    #[test]
    fn test_state_codes_layout() {
        let mut nodes = vec![node(FireState::NotBurnt); 3];
        nodes[2].state = FireState::Burning;
        let g = ForestGraph::with_layout(2, nodes);
        // id 3 sits at row 0, col 1; the unfilled cell (row 1, col 1) stays 0
        assert_eq!(g.state_codes(), vec![1, 2, 1, 0]);
        assert_eq!(g.grid_to_id(1, 1), None);
        assert_eq!(g.grid_to_id(0, 1), Some(3));
    }
}
