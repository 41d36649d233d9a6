//! End-to-end runs of the raster cellular automaton

use std::fs;
use std::path::{Path, PathBuf};
use wildfire_core::grid::{GeoKeys, GeoTransform};
use wildfire_core::{
    run_raster, CellState, ClassifiedRaster, ErrorKind, GeoReference, GeoTiffSnapshotWriter, RasterConfig,
    RasterIgnition, RunConfig, RunRequest, SimError, SnapshotWriter, StateGrid, StopReason,
};

#[ctor::ctor]
fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// 30 m pixels in Web Mercator with the top-left corner at (1000, 9000)
fn georef() -> GeoReference {
    let transform = GeoTransform::from_tiepoint(&[30.0, 30.0, 0.0], &[0.0, 0.0, 0.0, 1000.0, 9000.0, 0.0]).unwrap();
    GeoReference::new(transform, Some(GeoKeys::for_epsg(3857)))
}

/// Write `grid` as a classified `GeoTIFF` fixture and return its path
fn write_fixture(dir: &Path, grid: &StateGrid) -> PathBuf {
    GeoTiffSnapshotWriter::new(georef(), None).write(grid, 0, dir).unwrap()
}

fn run_config(base: &Path, seed: u64) -> RunConfig {
    RunConfig {
        output_base: base.to_path_buf(),
        label: Some("test".into()),
        seed: Some(seed),
    }
}

fn certain(ignition: RasterIgnition) -> RasterConfig {
    RasterConfig {
        timesteps: 10,
        p_ignition: 1.0,
        p_spontaneous: 0.0,
        crop_buffer: None,
        ignition,
    }
}

fn sorted_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir).unwrap().map(|e| e.unwrap().path()).collect();
    files.sort();
    files
}

#[test]
fn test_five_by_five_burns_out_in_three_steps() {
    let fixtures = tempfile::tempdir().unwrap();
    let base = tempfile::tempdir().unwrap();
    let raster = ClassifiedRaster::open(write_fixture(fixtures.path(), &StateGrid::filled(5, 5, CellState::Forest)))
        .unwrap();

    let cfg = certain(RasterIgnition::Pixel { row: 2, col: 2 });
    let report = run_raster(raster, &cfg, &run_config(base.path(), 1)).unwrap();

    assert_eq!(report.final_timestep, 3);
    assert_eq!(report.stop, StopReason::Extinguished);
    assert_eq!(report.burnt, 25);
    assert_eq!(report.grid_size, (5, 5));

    let files = sorted_files(&report.output_dir);
    assert_eq!(files.len(), 4);
    assert!(files[0].ends_with("wildfire_t_000.tif"));
    assert!(files[3].ends_with("wildfire_t_003.tif"));

    let t0 = ClassifiedRaster::open(&files[0]).unwrap();
    assert_eq!(t0.grid.burning_count(), 1);
    assert_eq!(t0.grid.get(2, 2), Some(CellState::Burning));
    let t1 = ClassifiedRaster::open(&files[1]).unwrap();
    assert_eq!(t1.grid.burning_count(), 8);
    assert_eq!(t1.grid.get(2, 2), Some(CellState::Burnt));
    let t3 = ClassifiedRaster::open(&files[3]).unwrap();
    assert_eq!(t3.grid.count(CellState::Burnt), 25);
    assert_eq!(t3.georef, georef());
}

#[test]
fn test_coordinate_ignition_and_cropped_output() {
    let fixtures = tempfile::tempdir().unwrap();
    let base = tempfile::tempdir().unwrap();
    let raster =
        ClassifiedRaster::open(write_fixture(fixtures.path(), &StateGrid::filled(20, 20, CellState::Forest))).unwrap();

    // Pick the lat/lon at the centre of pixel (10, 12)
    let (x, y) = georef().transform.apply(12.5, 10.5);
    let lon = (x / 6_378_137.0).to_degrees();
    let lat = (2.0 * (y / 6_378_137.0).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    assert_eq!(raster.pixel_for_coordinate(lat, lon).unwrap(), (10, 12));

    let cfg = RasterConfig {
        timesteps: 2,
        crop_buffer: Some(3),
        ..certain(RasterIgnition::Coordinate { lat, lon })
    };
    let report = run_raster(raster, &cfg, &run_config(base.path(), 2)).unwrap();
    assert_eq!(report.final_timestep, 2);
    assert_eq!(report.stop, StopReason::StepLimit);

    let first = ClassifiedRaster::open(&sorted_files(&report.output_dir)[0]).unwrap();
    assert_eq!(first.grid.shape(), (6, 6));
    assert_eq!(first.grid.get(3, 3), Some(CellState::Burning));
    assert_eq!(first.georef.transform.pixel_of(x, y), Some((3, 3)));
}

#[test]
fn test_no_forest_ignition_writes_nothing() {
    let fixtures = tempfile::tempdir().unwrap();
    let base = tempfile::tempdir().unwrap();
    let mut grid = StateGrid::filled(5, 5, CellState::Forest);
    grid.set(1, 1, CellState::NoForest);
    let raster = ClassifiedRaster::open(write_fixture(fixtures.path(), &grid)).unwrap();

    let err = run_raster(raster, &certain(RasterIgnition::Pixel { row: 1, col: 1 }), &run_config(base.path(), 3))
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidIgnitionPoint { row: 1, col: 1, value: 0 }));
    assert_eq!(err.kind(), ErrorKind::Domain);
    assert_eq!(fs::read_dir(base.path()).unwrap().count(), 0);
}

#[test]
fn test_out_of_bounds_ignition_writes_nothing() {
    let fixtures = tempfile::tempdir().unwrap();
    let base = tempfile::tempdir().unwrap();
    let raster =
        ClassifiedRaster::open(write_fixture(fixtures.path(), &StateGrid::filled(5, 5, CellState::Forest))).unwrap();

    let err = run_raster(raster, &certain(RasterIgnition::Pixel { row: -1, col: 7 }), &run_config(base.path(), 4))
        .unwrap_err();
    assert!(matches!(err, SimError::IgnitionOutOfBounds { row: -1, col: 7, height: 5, width: 5 }));
    assert_eq!(fs::read_dir(base.path()).unwrap().count(), 0);
}

#[test]
fn test_same_seed_gives_identical_rasters() {
    let fixtures = tempfile::tempdir().unwrap();
    let fixture = write_fixture(fixtures.path(), &StateGrid::filled(30, 30, CellState::Forest));
    let cfg = RasterConfig {
        timesteps: 6,
        p_ignition: 0.4,
        p_spontaneous: 0.001,
        crop_buffer: Some(10),
        ignition: RasterIgnition::Random,
    };

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let base = tempfile::tempdir().unwrap();
        let request = RunRequest::Raster {
            raster: fixture.clone(),
            config: cfg.clone(),
            run: run_config(base.path(), 99),
        };
        let report = request.execute().unwrap();
        let bytes: Vec<Vec<u8>> = sorted_files(&report.output_dir)
            .iter()
            .map(|f| fs::read(f).unwrap())
            .collect();
        outputs.push(bytes);
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn test_missing_raster_is_input_error() {
    let base = tempfile::tempdir().unwrap();
    let request = RunRequest::Raster {
        raster: base.path().join("missing.tif"),
        config: RasterConfig::default(),
        run: run_config(base.path(), 5),
    };
    let err = request.execute().unwrap_err();
    assert!(matches!(err, SimError::RasterRead { .. }));
    assert_eq!(fs::read_dir(base.path()).unwrap().count(), 0);
}
