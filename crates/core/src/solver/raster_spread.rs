//! Raster cellular automaton
//!
//! Each step burning cells burn out, and forest cells ignite with probability
//! `p_ignition` if any of their eight Moore neighbours was burning, or with
//! `p_spontaneous` otherwise. Neighbour counts use zero fill past the grid edge.

use crate::core_types::{CellState, SimRng};
use crate::error::{Result, SimError};
use crate::grid::StateGrid;
use crate::simulation::RasterConfig;
use crate::solver::SpreadModel;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What happened during one raster step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterStepStats {
    pub step: u32,
    pub ignited: usize,
    pub burnt_out: usize,
    /// Burning cells after the step
    pub burning: usize,
}

/// Burning Moore neighbours of every cell, row-major
pub fn burning_neighbor_counts(grid: &StateGrid) -> Vec<u8> {
    let (rows, cols) = grid.shape();
    let cells = grid.cells();
    let burning = |r: usize, c: usize| u8::from(cells[r * cols + c] == CellState::Burning);

    let mut counts = vec![0_u8; rows * cols];
    if cols == 0 {
        return counts;
    }
    counts.par_chunks_mut(cols).enumerate().for_each(|(r, out)| {
        let r_lo = r.saturating_sub(1);
        let r_hi = (r + 1).min(rows - 1);
        for (c, slot) in out.iter_mut().enumerate() {
            let c_lo = c.saturating_sub(1);
            let c_hi = (c + 1).min(cols - 1);
            let mut n = 0;
            for nr in r_lo..=r_hi {
                for nc in c_lo..=c_hi {
                    if (nr, nc) != (r, c) {
                        n += burning(nr, nc);
                    }
                }
            }
            *slot = n;
        }
    });
    counts
}

/// The cellular-automaton engine
#[derive(Debug, Clone, Default)]
pub struct RasterSpread {
    config: RasterConfig,
}

impl RasterSpread {
    pub fn new(config: RasterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Set the ignition pixel on fire
    pub fn ignite(&self, grid: &mut StateGrid, row: usize, col: usize) -> Result<()> {
        match grid.get(row, col) {
            Some(CellState::Forest) => {
                grid.set(row, col, CellState::Burning);
                Ok(())
            }
            Some(other) => Err(SimError::InvalidIgnitionPoint {
                row,
                col,
                value: other.code(),
            }),
            None => Err(SimError::IgnitionOutOfBounds {
                row: row as i64,
                col: col as i64,
                height: grid.rows(),
                width: grid.cols(),
            }),
        }
    }
}

impl SpreadModel for RasterSpread {
    type State = StateGrid;
    type Stats = RasterStepStats;

    fn name(&self) -> &'static str {
        "raster"
    }

    fn advance(&self, grid: &mut StateGrid, step: u32, rng: &mut SimRng) -> RasterStepStats {
        let counts = burning_neighbor_counts(grid);
        let spontaneous = self.config.p_spontaneous > 0.0;

        let mut stats = RasterStepStats {
            step,
            ..Default::default()
        };
        for (cell, &n) in grid.cells_mut().iter_mut().zip(&counts) {
            match *cell {
                CellState::Burning => {
                    *cell = CellState::Burnt;
                    stats.burnt_out += 1;
                }
                CellState::Forest => {
                    let ignites = if n > 0 {
                        rng.chance(self.config.p_ignition)
                    } else {
                        spontaneous && rng.chance(self.config.p_spontaneous)
                    };
                    if ignites {
                        *cell = CellState::Burning;
                        stats.ignited += 1;
                    }
                }
                CellState::NoForest | CellState::Burnt => {}
            }
        }
        stats.burning = stats.ignited;

        debug!(
            "Step {}: {} ignited, {} burnt out, {} burning",
            step, stats.ignited, stats.burnt_out, stats.burning
        );
        stats
    }

    fn burning(&self, grid: &StateGrid) -> usize {
        grid.burning_count()
    }
}
