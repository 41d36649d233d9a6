//! Simulation driver
//!
//! Owns the timestep loop, the termination rule and the run directory, and composes
//! domain building, propagation and snapshot output:
//!
//! - [`run_loop`] writes step 0, then advances and writes each step until the step
//!   bound or until nothing is burning.
//! - [`run_graph`] and [`run_raster`] validate inputs and resolve the ignition before
//!   any file is created, so a failed run leaves nothing on disk.
//! - [`RunRequest`] is the serializable entry point used by the CLI and the C ABI.

pub mod config;
pub mod run_dir;

pub use config::{GraphConfig, GraphIgnition, RasterConfig, RasterIgnition, RunConfig};
pub use run_dir::RunDirectory;

use crate::core_types::{CellState, FireState, SimRng};
use crate::error::Result;
use crate::export::{GeoTiffSnapshotWriter, PngSnapshotWriter, SnapshotWriter};
use crate::grid::{build_forest_graph, ClassifiedRaster, CropWindow, ForestBoundary, TerrainTable};
use crate::solver::{GraphSpread, RasterSpread, SpreadModel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Directory prefix for graph runs
pub const GRAPH_RUN_PREFIX: &str = "wildfire_run";
/// Directory prefix for raster runs
pub const RASTER_RUN_PREFIX: &str = "sim_run";

/// Which propagation engine produced a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    Graph,
    Raster,
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No unit was burning after the last step
    Extinguished,
    /// The configured number of steps ran out
    StepLimit,
}

/// Result of [`run_loop`]
#[derive(Debug, Clone)]
pub struct LoopOutcome<S> {
    /// Index of the last state written
    pub final_timestep: u32,
    /// Snapshot files written, in step order
    pub frames: Vec<PathBuf>,
    pub stop: StopReason,
    /// Stats of every advanced step
    pub history: Vec<S>,
}

/// Drive `model` over `state`, writing one snapshot per state into `dir`
pub fn run_loop<M, W>(
    model: &M,
    state: &mut M::State,
    writer: &W,
    dir: &Path,
    timesteps: u32,
    rng: &mut SimRng,
) -> Result<LoopOutcome<M::Stats>>
where
    M: SpreadModel,
    W: SnapshotWriter<M::State>,
{
    let mut frames = vec![writer.write(state, 0, dir)?];
    let mut history = Vec::with_capacity(timesteps as usize);
    let mut final_timestep = 0;
    let mut stop = StopReason::StepLimit;

    for step in 1..=timesteps {
        history.push(model.advance(state, step, rng));
        frames.push(writer.write(state, step, dir)?);
        final_timestep = step;

        if model.burning(state) == 0 {
            stop = StopReason::Extinguished;
            break;
        }
    }

    info!(
        "{} run stopped at step {} ({:?}), {} frames",
        model.name(),
        final_timestep,
        stop,
        frames.len()
    );
    Ok(LoopOutcome {
        final_timestep,
        frames,
        stop,
        history,
    })
}

/// Summary handed back to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub message: String,
    pub output_dir: PathBuf,
    pub engine: Engine,
    /// `(rows, cols)` of the simulated domain
    pub grid_size: (usize, usize),
    pub final_timestep: u32,
    /// Number of snapshot files written
    pub frames: usize,
    pub stop: StopReason,
    /// Seed that reproduces this run
    pub seed: u64,
    /// Units burnt when the run ended
    pub burnt: usize,
}

fn seeded_rng(run: &RunConfig) -> SimRng {
    let rng = run.seed.map_or_else(SimRng::from_entropy, SimRng::from_seed_u64);
    info!("Random seed: {}", rng.seed());
    rng
}

/// Run the weighted-graph engine
pub fn run_graph(
    terrain: &TerrainTable,
    boundary: Option<&ForestBoundary>,
    config: &GraphConfig,
    run: &RunConfig,
) -> Result<RunReport> {
    config.validate()?;
    let mut rng = seeded_rng(run);

    let mut graph = build_forest_graph(terrain, boundary, config, &mut rng)?;
    let model = GraphSpread::new(config.clone());
    model.ignite(&mut graph, &mut rng)?;

    let dir = RunDirectory::create(&run.output_base, GRAPH_RUN_PREFIX, run.label.as_deref())?;
    let writer = PngSnapshotWriter::new(config.snapshot_pixel_scale);
    let outcome = run_loop(&model, &mut graph, &writer, dir.path(), config.timesteps, &mut rng)?;

    let burnt = graph.count(FireState::Burnt);
    Ok(RunReport {
        message: format!(
            "Graph simulation finished after {} steps; {} of {} occupied nodes burnt",
            outcome.final_timestep,
            burnt,
            graph.occupied_ids().len()
        ),
        output_dir: dir.into_path(),
        engine: Engine::Graph,
        grid_size: (graph.grid_size(), graph.grid_size()),
        final_timestep: outcome.final_timestep,
        frames: outcome.frames.len(),
        stop: outcome.stop,
        seed: rng.seed(),
        burnt,
    })
}

/// Run the raster cellular automaton
pub fn run_raster(raster: ClassifiedRaster, config: &RasterConfig, run: &RunConfig) -> Result<RunReport> {
    config.validate()?;
    let mut rng = seeded_rng(run);

    let (row, col) = raster.resolve_ignition(&config.ignition, &mut rng)?;
    let ClassifiedRaster { mut grid, georef } = raster;
    let model = RasterSpread::new(config.clone());
    model.ignite(&mut grid, row, col)?;
    info!("Ignition at pixel ({}, {})", row, col);

    let (rows, cols) = grid.shape();
    let window = config
        .crop_buffer
        .map(|buffer| CropWindow::around(row, col, buffer, rows, cols));
    let writer = GeoTiffSnapshotWriter::new(georef, window);

    let dir = RunDirectory::create(&run.output_base, RASTER_RUN_PREFIX, run.label.as_deref())?;
    let outcome = run_loop(&model, &mut grid, &writer, dir.path(), config.timesteps, &mut rng)?;

    let burnt = grid.count(CellState::Burnt);
    Ok(RunReport {
        message: format!(
            "Raster simulation finished after {} steps; {} cells burnt",
            outcome.final_timestep, burnt
        ),
        output_dir: dir.into_path(),
        engine: Engine::Raster,
        grid_size: (rows, cols),
        final_timestep: outcome.final_timestep,
        frames: outcome.frames.len(),
        stop: outcome.stop,
        seed: rng.seed(),
        burnt,
    })
}

/// A complete, serializable run request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "engine", rename_all = "snake_case")]
pub enum RunRequest {
    Graph {
        /// CSV with `Slope`, `Elevation` and `Aspect` columns
        terrain_csv: PathBuf,
        /// Optional `GeoJSON` forest boundary
        #[serde(default)]
        boundary_geojson: Option<PathBuf>,
        #[serde(default)]
        config: GraphConfig,
        #[serde(default)]
        run: RunConfig,
    },
    Raster {
        /// Single-band classified `GeoTIFF`
        raster: PathBuf,
        #[serde(default)]
        config: RasterConfig,
        #[serde(default)]
        run: RunConfig,
    },
}

impl RunRequest {
    /// Load the inputs and run
    pub fn execute(&self) -> Result<RunReport> {
        match self {
            RunRequest::Graph {
                terrain_csv,
                boundary_geojson,
                config,
                run,
            } => {
                let terrain = TerrainTable::from_csv_path(terrain_csv)?;
                let boundary = match boundary_geojson {
                    Some(path) => Some(ForestBoundary::from_geojson_str(&std::fs::read_to_string(path)?)?),
                    None => None,
                };
                run_graph(&terrain, boundary.as_ref(), config, run)
            }
            RunRequest::Raster { raster, config, run } => {
                run_raster(ClassifiedRaster::open(raster)?, config, run)
            }
        }
    }
}
