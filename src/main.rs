//! # UAV Maneuvers
//!
//! Runs the configured maneuver mission against the simulated vehicle.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use uav_maneuvers::config::{Config, LoggingConfig};
use uav_maneuvers::maneuver::Maneuvers;
use uav_maneuvers::mission::{self, MissionError};
use uav_maneuvers::sim::SimulatedVehicle;

/// Config file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Log file name prefix inside `logging.directory`
const LOG_FILE_PREFIX: &str = "uav-maneuvers.log";

/// Main entry point
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, else `config/default.toml`, else defaults)
///    - Set up logging with tracing subscriber
///    - Create the simulated vehicle
///
/// 2. **Mission**
///    - Obtain control authority
///    - Run each configured step in order, stopping at the first failure
///    - On Ctrl+C, finish the current step (braking and teardown included), then exit
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded or the mission fails.
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO uav_maneuvers: UAV Maneuvers v0.1.0 starting...
/// INFO uav_maneuvers::mission: Mission step 1/5: takeoff
/// INFO uav_maneuvers::monitor: Motors spinning...
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config(config_path(std::env::args().nth(1)).as_deref())?;
    let _guard = init_logging(&config.logging);

    info!("UAV Maneuvers v{} starting...", env!("CARGO_PKG_VERSION"));

    let vehicle = SimulatedVehicle::new(config.sim.clone());
    let maneuvers = Maneuvers::new(&vehicle, &vehicle, &vehicle, &config);

    info!("Running {} mission steps", config.mission.steps.len());
    info!("Press Ctrl+C to exit");

    let (stop_tx, stop) = watch::channel(false);
    let mission = mission::run(&maneuvers, &config.mission.steps, &stop);
    tokio::pin!(mission);

    let outcome = tokio::select! {
        outcome = &mut mission => outcome,

        // Ctrl+C lets the current step brake and tear down before exiting
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, finishing the current step...");
            let _ = stop_tx.send(true);
            mission.await
        }
    };

    match outcome {
        Ok(()) | Err(MissionError::Stopped { .. }) => {}
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    }

    info!("Simulated flight time: {:?}", vehicle.elapsed());
    Ok(())
}

/// Pick the config file: explicit argument, else the default path if present
fn config_path(arg: Option<String>) -> Option<PathBuf> {
    match arg {
        Some(path) => Some(PathBuf::from(path)),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            default.exists().then_some(default)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::load(path).with_context(|| format!("failed to load config from {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

/// Install the global subscriber; `RUST_LOG` overrides the configured level.
///
/// Returns the appender guard, which must live until exit to flush file logs.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_explicit_config_path_wins() {
        let path = config_path(Some("custom.toml".to_string()));
        assert_eq!(path, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.mission.steps.len(), 5);
    }

    #[test]
    fn test_load_config_reports_path() {
        let err = load_config(Some(Path::new("/nonexistent/uav.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/uav.toml"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.logging.level, "debug");
    }
}
