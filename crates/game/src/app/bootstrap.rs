use std::path::PathBuf;

use iso_engine::{load_map, GameWorld, LoopConfig, MapLoadError, Scene, VehicleTemplate, Visual};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::driving::DrivingScene;
use super::street_grid::street_grid;
use super::tuning::{load_tuning, DrivingTuning, TUNING_ENV_VAR};

pub(crate) const MAP_ENV_VAR: &str = "COURIER_MAP";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) world: GameWorld,
    pub(crate) scene: Box<dyn Scene>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MapSource {
    File(PathBuf),
    StreetGrid,
}

pub(crate) fn build_app() -> Result<AppWiring, MapLoadError> {
    init_tracing();
    info!("=== Courier Startup ===");

    let tuning = resolve_tuning();
    let vehicle = VehicleTemplate {
        radius: tuning.vehicle_radius,
        visual: Visual::Dot {
            color: [220, 30, 30, 255],
            radius_px: 4.0,
        },
    };
    let source = resolve_map_source(
        std::env::args().skip(1),
        std::env::var(MAP_ENV_VAR).ok(),
    );
    info!(source = ?source, "map_source");
    let world = match &source {
        MapSource::File(path) => load_map(path, &vehicle)?,
        MapSource::StreetGrid => street_grid(&vehicle)?,
    };

    Ok(AppWiring {
        config: LoopConfig::default(),
        world,
        scene: Box::new(DrivingScene::new(tuning, vehicle)),
    })
}

/// The first CLI argument wins over the environment; with neither, a street
/// grid is generated.
fn resolve_map_source(
    mut args: impl Iterator<Item = String>,
    env_value: Option<String>,
) -> MapSource {
    args.next()
        .or(env_value)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map_or(MapSource::StreetGrid, |raw| MapSource::File(PathBuf::from(raw)))
}

fn resolve_tuning() -> DrivingTuning {
    let Some(path) = std::env::var_os(TUNING_ENV_VAR).map(PathBuf::from) else {
        return DrivingTuning::default();
    };
    match load_tuning(&path) {
        Ok(tuning) => {
            info!(path = %path.display(), "tuning_loaded");
            tuning
        }
        Err(error) => {
            warn!(error = %error, "tuning_rejected");
            DrivingTuning::default()
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
