use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;
use wildfire_core::{
    GraphConfig, GraphIgnition, RasterConfig, RasterIgnition, RunConfig, RunReport, RunRequest,
};

/// Headless wildfire spread runner
#[derive(Parser, Debug)]
#[command(name = "wildfire-headless")]
#[command(about = "Run a stochastic wildfire spread simulation and write one snapshot per step", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Parent directory for run output folders
    #[arg(short, long, global = true, default_value = "wildfire_output")]
    output: PathBuf,

    /// Label appended to the run directory name
    #[arg(short, long, global = true)]
    label: Option<String>,

    /// Fixed random seed (random if omitted)
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    /// JSON file with engine configuration; command-line flags override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Weighted-graph engine over a terrain table
    Graph(GraphArgs),
    /// Cellular automaton over a classified GeoTIFF
    Raster(RasterArgs),
    /// Execute a complete JSON run request
    Request {
        /// Path to the request document
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct GraphArgs {
    /// CSV with Slope, Elevation and Aspect columns
    #[arg(short, long)]
    terrain: PathBuf,

    /// GeoJSON forest boundary
    #[arg(short, long)]
    boundary: Option<PathBuf>,

    /// Requested node count
    #[arg(short, long)]
    nodes: Option<usize>,

    /// Probability that a grid position carries fuel
    #[arg(short, long)]
    density: Option<f64>,

    /// Maximum number of steps
    #[arg(long)]
    timesteps: Option<u32>,

    /// Node id to ignite (random if omitted)
    #[arg(short, long)]
    ignite: Option<usize>,
}

#[derive(Args, Debug)]
struct RasterArgs {
    /// Classified single-band GeoTIFF
    #[arg(short, long)]
    raster: PathBuf,

    /// Ignition latitude in degrees
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Ignition longitude in degrees
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Ignition pixel as ROW,COL
    #[arg(long, value_delimiter = ',', num_args = 2, conflicts_with = "lat")]
    pixel: Option<Vec<i64>>,

    /// Maximum number of steps
    #[arg(long)]
    timesteps: Option<u32>,

    /// Neighbour ignition probability
    #[arg(short, long)]
    p_ignition: Option<f64>,

    /// Pixels kept around the ignition point in output
    #[arg(long, conflicts_with = "full_extent")]
    crop_buffer: Option<usize>,

    /// Write the whole grid instead of a crop window
    #[arg(long)]
    full_extent: bool,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("parsing {}: {e}", path.display()))
}

/// Read a JSON document, or the default when no path is given
fn load_json<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T, String> {
    path.map_or_else(|| Ok(T::default()), read_json)
}

fn graph_request(args: GraphArgs, config: Option<&Path>, run: RunConfig) -> Result<RunRequest, String> {
    let mut config: GraphConfig = load_json(config)?;
    if let Some(nodes) = args.nodes {
        config.node_count = nodes;
    }
    if let Some(density) = args.density {
        config.density_factor = density;
    }
    if let Some(timesteps) = args.timesteps {
        config.timesteps = timesteps;
    }
    if let Some(id) = args.ignite {
        config.ignition = GraphIgnition::Node { id };
    }
    Ok(RunRequest::Graph {
        terrain_csv: args.terrain,
        boundary_geojson: args.boundary,
        config,
        run,
    })
}

fn raster_request(args: RasterArgs, config: Option<&Path>, run: RunConfig) -> Result<RunRequest, String> {
    let mut config: RasterConfig = load_json(config)?;
    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        config.ignition = RasterIgnition::Coordinate { lat, lon };
    }
    if let Some(pixel) = args.pixel {
        config.ignition = RasterIgnition::Pixel {
            row: pixel[0],
            col: pixel[1],
        };
    }
    if let Some(timesteps) = args.timesteps {
        config.timesteps = timesteps;
    }
    if let Some(p) = args.p_ignition {
        config.p_ignition = p;
    }
    if args.full_extent {
        config.crop_buffer = None;
    } else if let Some(buffer) = args.crop_buffer {
        config.crop_buffer = Some(buffer);
    }
    Ok(RunRequest::Raster {
        raster: args.raster,
        config,
        run,
    })
}

fn build_request(cli: Cli) -> Result<RunRequest, String> {
    let run = RunConfig {
        output_base: cli.output,
        label: cli.label,
        seed: cli.seed,
    };
    match cli.command {
        Command::Graph(args) => graph_request(args, cli.config.as_deref(), run),
        Command::Raster(args) => raster_request(args, cli.config.as_deref(), run),
        Command::Request { file } => read_json(&file),
    }
}

fn print_report(report: &RunReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{}", report.message),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let request = match build_request(Cli::parse()) {
        Ok(request) => request,
        Err(message) => {
            error!("{}", message);
            return ExitCode::from(2);
        }
    };

    match request.execute() {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Simulation failed ({:?}): {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}
