//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every poll cadence, cycle budget and control constant used by the
//! maneuvers lives here so behavior can be tuned per link latency and
//! exercised under simulated time.

use serde::de::Error as _;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::mission::MissionStep;

/// Telemetry rates accepted by the vehicle link (Hz)
pub const SUPPORTED_RATES_HZ: &[u16] = &[1, 10, 50, 100, 200, 400];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub position: PositionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(default)]
    pub mission: MissionConfig,
}

/// Vehicle link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,

    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,
}

/// Flight state monitor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_status_rate_hz")]
    pub status_rate_hz: u16,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_motors_start_max_cycles")]
    pub motors_start_max_cycles: u32,

    #[serde(default = "default_airborne_max_cycles")]
    pub airborne_max_cycles: u32,

    #[serde(default = "default_settle_poll_interval_ms")]
    pub settle_poll_interval_ms: u64,

    #[serde(default = "default_settle_max_cycles")]
    pub settle_max_cycles: u32,

    #[serde(default = "default_landing_start_max_cycles")]
    pub landing_start_max_cycles: u32,

    #[serde(default = "default_touchdown_max_cycles")]
    pub touchdown_max_cycles: u32,
}

/// Position control loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PositionConfig {
    #[serde(default = "default_control_rate_hz")]
    pub control_rate_hz: u16,

    #[serde(default = "default_speed_factor_m")]
    pub speed_factor_m: f64,

    #[serde(default = "default_z_deadband_m")]
    pub z_deadband_m: f64,

    #[serde(default = "default_out_of_bounds_limit_cycles")]
    pub out_of_bounds_limit_cycles: u32,

    #[serde(default = "default_dwell_cycles")]
    pub dwell_cycles: u32,

    #[serde(default = "default_position_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_position_tolerance_m")]
    pub position_tolerance_m: f64,

    #[serde(default = "default_yaw_tolerance_deg")]
    pub yaw_tolerance_deg: f64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Daily-rolling log file directory; stdout only when unset
    #[serde(default)]
    pub directory: Option<String>,
}

/// Simulated vehicle configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SimConfig {
    /// Also wait on the wall clock when the simulated clock sleeps
    #[serde(default)]
    pub realtime: bool,

    #[serde(default = "default_home_latitude_deg")]
    pub home_latitude_deg: f64,

    #[serde(default = "default_home_longitude_deg")]
    pub home_longitude_deg: f64,

    #[serde(default = "default_home_altitude_m")]
    pub home_altitude_m: f64,

    #[serde(default = "default_max_speed_mps")]
    pub max_speed_mps: f64,

    #[serde(default = "default_climb_rate_mps")]
    pub climb_rate_mps: f64,

    #[serde(default = "default_yaw_rate_dps")]
    pub yaw_rate_dps: f64,

    #[serde(default = "default_engine_start_ms")]
    pub engine_start_ms: u64,

    #[serde(default = "default_takeoff_altitude_m")]
    pub takeoff_altitude_m: f64,

    #[serde(default = "default_takeoff_rate_mps")]
    pub takeoff_rate_mps: f64,

    #[serde(default = "default_landing_delay_ms")]
    pub landing_delay_ms: u64,

    #[serde(default = "default_landing_rate_mps")]
    pub landing_rate_mps: f64,

    /// Link code returned when a takeoff or landing request is refused
    #[serde(default = "default_nack_code")]
    pub nack_code: u16,

    #[serde(default)]
    pub faults: SimFaults,
}

/// Faults the simulated vehicle can inject
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimFaults {
    /// `verify` fails
    #[serde(default)]
    pub link_not_ready: bool,
    /// Control authority request is refused
    #[serde(default)]
    pub deny_authority: bool,
    /// Package allocation fails
    #[serde(default)]
    pub package_init_fails: bool,
    /// Package start fails
    #[serde(default)]
    pub package_start_fails: bool,
    /// Package removal fails
    #[serde(default)]
    pub package_remove_fails: bool,
    /// Takeoff request is refused
    #[serde(default)]
    pub reject_takeoff: bool,
    /// Landing request is refused
    #[serde(default)]
    pub reject_land: bool,
    /// Takeoff accepted but motors never spin up
    #[serde(default)]
    pub motors_never_start: bool,
    /// Auto-takeoff starts but the climb never completes
    #[serde(default)]
    pub stuck_on_ground: bool,
    /// Takeoff completes in manual mode instead of P-GPS
    #[serde(default)]
    pub settle_in_manual: bool,
    /// Landing accepted but never starts
    #[serde(default)]
    pub landing_never_starts: bool,
    /// Vehicle ignores position setpoints
    #[serde(default)]
    pub frozen: bool,
}

/// Mission configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MissionConfig {
    #[serde(default = "default_mission_steps")]
    pub steps: Vec<MissionStep>,
}

// Default value functions
fn default_response_timeout_ms() -> u64 { 1000 }
fn default_warmup_ms() -> u64 { 1000 }

fn default_status_rate_hz() -> u16 { 10 }
fn default_poll_interval_ms() -> u64 { 100 }
fn default_motors_start_max_cycles() -> u32 { 20 }
fn default_airborne_max_cycles() -> u32 { 110 }
fn default_settle_poll_interval_ms() -> u64 { 1000 }
fn default_settle_max_cycles() -> u32 { 30 }
fn default_landing_start_max_cycles() -> u32 { 20 }
fn default_touchdown_max_cycles() -> u32 { 60 }

fn default_control_rate_hz() -> u16 { 50 }
fn default_speed_factor_m() -> f64 { 2.0 }
fn default_z_deadband_m() -> f64 { 0.12 }
fn default_out_of_bounds_limit_cycles() -> u32 { 10 }
fn default_dwell_cycles() -> u32 { 50 }
fn default_position_timeout_ms() -> u64 { 10_000 }
fn default_position_tolerance_m() -> f64 { 0.2 }
fn default_yaw_tolerance_deg() -> f64 { 1.0 }

fn default_log_level() -> String { "info".to_string() }

fn default_home_latitude_deg() -> f64 { 22.5428 }
fn default_home_longitude_deg() -> f64 { 113.9581 }
fn default_home_altitude_m() -> f64 { 10.0 }
fn default_max_speed_mps() -> f64 { 2.0 }
fn default_climb_rate_mps() -> f64 { 1.5 }
fn default_yaw_rate_dps() -> f64 { 60.0 }
fn default_engine_start_ms() -> u64 { 1000 }
fn default_takeoff_altitude_m() -> f64 { 1.2 }
fn default_takeoff_rate_mps() -> f64 { 0.5 }
fn default_landing_delay_ms() -> u64 { 300 }
fn default_landing_rate_mps() -> f64 { 0.8 }
fn default_nack_code() -> u16 { 4 }

fn default_mission_steps() -> Vec<MissionStep> {
    vec![
        MissionStep::Takeoff,
        MissionStep::Move { x: 0.0, y: 6.0, z: 6.0, yaw: 30.0, position_tolerance: None, yaw_tolerance: None },
        MissionStep::Move { x: 6.0, y: 0.0, z: -3.0, yaw: -30.0, position_tolerance: None, yaw_tolerance: None },
        MissionStep::Move { x: -6.0, y: -6.0, z: 0.0, yaw: 0.0, position_tolerance: None, yaw_tolerance: None },
        MissionStep::Land,
    ]
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: default_response_timeout_ms(),
            warmup_ms: default_warmup_ms(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            status_rate_hz: default_status_rate_hz(),
            poll_interval_ms: default_poll_interval_ms(),
            motors_start_max_cycles: default_motors_start_max_cycles(),
            airborne_max_cycles: default_airborne_max_cycles(),
            settle_poll_interval_ms: default_settle_poll_interval_ms(),
            settle_max_cycles: default_settle_max_cycles(),
            landing_start_max_cycles: default_landing_start_max_cycles(),
            touchdown_max_cycles: default_touchdown_max_cycles(),
        }
    }
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            control_rate_hz: default_control_rate_hz(),
            speed_factor_m: default_speed_factor_m(),
            z_deadband_m: default_z_deadband_m(),
            out_of_bounds_limit_cycles: default_out_of_bounds_limit_cycles(),
            dwell_cycles: default_dwell_cycles(),
            timeout_ms: default_position_timeout_ms(),
            position_tolerance_m: default_position_tolerance_m(),
            yaw_tolerance_deg: default_yaw_tolerance_deg(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            realtime: false,
            home_latitude_deg: default_home_latitude_deg(),
            home_longitude_deg: default_home_longitude_deg(),
            home_altitude_m: default_home_altitude_m(),
            max_speed_mps: default_max_speed_mps(),
            climb_rate_mps: default_climb_rate_mps(),
            yaw_rate_dps: default_yaw_rate_dps(),
            engine_start_ms: default_engine_start_ms(),
            takeoff_altitude_m: default_takeoff_altitude_m(),
            takeoff_rate_mps: default_takeoff_rate_mps(),
            landing_delay_ms: default_landing_delay_ms(),
            landing_rate_mps: default_landing_rate_mps(),
            nack_code: default_nack_code(),
            faults: SimFaults::default(),
        }
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            steps: default_mission_steps(),
        }
    }
}

impl LinkConfig {
    /// Timeout passed with every acknowledged link request
    #[must_use]
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Wait after starting a position package before the origin is captured
    #[must_use]
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

impl MonitorConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn settle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.settle_poll_interval_ms)
    }
}

impl PositionConfig {
    /// Control cycle period (`1000 / control_rate_hz` milliseconds)
    ///
    /// # Examples
    ///
    /// ```
    /// use uav_maneuvers::config::PositionConfig;
    ///
    /// let position = PositionConfig::default();
    /// assert_eq!(position.cycle_time().as_millis(), 20);
    /// ```
    #[must_use]
    pub fn cycle_time(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.control_rate_hz.max(1)))
    }

    /// Overall ceiling for one offset move
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use uav_maneuvers::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Ok if valid, Err if invalid
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Link timing
        if self.link.response_timeout_ms == 0 || self.link.response_timeout_ms > 10_000 {
            return Err(invalid("response_timeout_ms must be between 1 and 10000"));
        }

        if self.link.warmup_ms > 10_000 {
            return Err(invalid("warmup_ms must be at most 10000"));
        }

        // Telemetry rates
        if !SUPPORTED_RATES_HZ.contains(&self.monitor.status_rate_hz) {
            return Err(invalid("status_rate_hz must be one of: 1, 10, 50, 100, 200, 400"));
        }

        if !SUPPORTED_RATES_HZ.contains(&self.position.control_rate_hz) {
            return Err(invalid("control_rate_hz must be one of: 1, 10, 50, 100, 200, 400"));
        }

        // Monitor cadence and budgets
        for (name, value) in [
            ("poll_interval_ms", self.monitor.poll_interval_ms),
            ("settle_poll_interval_ms", self.monitor.settle_poll_interval_ms),
        ] {
            if value == 0 || value > 10_000 {
                return Err(invalid(format!("{} must be between 1 and 10000", name)));
            }
        }

        for (name, value) in [
            ("motors_start_max_cycles", self.monitor.motors_start_max_cycles),
            ("airborne_max_cycles", self.monitor.airborne_max_cycles),
            ("settle_max_cycles", self.monitor.settle_max_cycles),
            ("landing_start_max_cycles", self.monitor.landing_start_max_cycles),
            ("touchdown_max_cycles", self.monitor.touchdown_max_cycles),
        ] {
            if value == 0 {
                return Err(invalid(format!("{} must be greater than 0", name)));
            }
        }

        // Position control
        if self.position.speed_factor_m <= 0.0 || self.position.speed_factor_m > 10.0 {
            return Err(invalid("speed_factor_m must be greater than 0.0 and at most 10.0"));
        }

        if self.position.z_deadband_m <= 0.0 || self.position.z_deadband_m > 1.0 {
            return Err(invalid("z_deadband_m must be greater than 0.0 and at most 1.0"));
        }

        if self.position.dwell_cycles == 0 {
            return Err(invalid("dwell_cycles must be greater than 0"));
        }

        if self.position.out_of_bounds_limit_cycles == 0 {
            return Err(invalid("out_of_bounds_limit_cycles must be greater than 0"));
        }

        let dwell = self.position.cycle_time() * self.position.dwell_cycles;
        if self.position.timeout() <= dwell {
            return Err(invalid("timeout_ms must be longer than the convergence dwell time"));
        }

        if self.position.position_tolerance_m <= 0.0 || self.position.position_tolerance_m > 5.0 {
            return Err(invalid("position_tolerance_m must be greater than 0.0 and at most 5.0"));
        }

        if self.position.yaw_tolerance_deg <= 0.0 || self.position.yaw_tolerance_deg > 45.0 {
            return Err(invalid("yaw_tolerance_deg must be greater than 0.0 and at most 45.0"));
        }

        // Logging
        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("level must be one of: trace, debug, info, warn, error"));
        }

        if matches!(&self.logging.directory, Some(dir) if dir.is_empty()) {
            return Err(invalid("logging directory cannot be empty when set"));
        }

        // Simulator
        if self.sim.home_latitude_deg.abs() > 89.0 {
            return Err(invalid("home_latitude_deg must be between -89 and 89"));
        }

        if self.sim.home_longitude_deg.abs() > 180.0 {
            return Err(invalid("home_longitude_deg must be between -180 and 180"));
        }

        for (name, value) in [
            ("max_speed_mps", self.sim.max_speed_mps),
            ("climb_rate_mps", self.sim.climb_rate_mps),
            ("yaw_rate_dps", self.sim.yaw_rate_dps),
            ("takeoff_altitude_m", self.sim.takeoff_altitude_m),
            ("takeoff_rate_mps", self.sim.takeoff_rate_mps),
            ("landing_rate_mps", self.sim.landing_rate_mps),
        ] {
            if value <= 0.0 {
                return Err(invalid(format!("{} must be greater than 0.0", name)));
            }
        }

        if self.sim.nack_code == 0 {
            return Err(invalid("nack_code must not be the success code 0"));
        }

        // Mission
        for (index, step) in self.mission.steps.iter().enumerate() {
            if let MissionStep::Move { position_tolerance, yaw_tolerance, .. } = step {
                if matches!(position_tolerance, Some(t) if *t <= 0.0) {
                    return Err(invalid(format!("mission step {} position_tolerance must be greater than 0.0", index)));
                }
                if matches!(yaw_tolerance, Some(t) if *t <= 0.0) {
                    return Err(invalid(format!("mission step {} yaw_tolerance must be greater than 0.0", index)));
                }
            }
        }

        Ok(())
    }
}

fn invalid(message: impl std::fmt::Display) -> Error {
    Error::Config(toml::de::Error::custom(message))
}
