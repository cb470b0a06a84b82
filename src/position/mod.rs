//! # Position Control Loop
//!
//! Moves the vehicle by a local offset using a receding setpoint.
//!
//! ## Algorithm
//!
//! 1. Capture the origin from the fused position (once per run)
//! 2. Command x/y at most `speed_factor` meters ahead of the vehicle,
//!    z as an absolute altitude (`origin.altitude + z`), yaw in degrees
//! 3. Each cycle: send the setpoint, sleep one cycle, re-read position and
//!    attitude; an axis whose remaining offset is under `speed_factor`
//!    switches to commanding exactly the remainder
//! 4. Track dwell inside `(position_tolerance, z_deadband, yaw_tolerance)`
//!    with [`ConvergenceCounters`]
//! 5. Stop on convergence or at the overall ceiling, then brake for the
//!    dwell duration on every exit path
//!
//! ## Usage
//!
//! ```no_run
//! use uav_maneuvers::config::Config;
//! use uav_maneuvers::position::{Goal, PositionController};
//! use uav_maneuvers::sim::SimulatedVehicle;
//!
//! # async fn run() -> Result<(), uav_maneuvers::error::ManeuverError> {
//! let config = Config::default();
//! let vehicle = SimulatedVehicle::new(config.sim.clone());
//! let controller = PositionController::new(&vehicle, &vehicle, &vehicle, &config.position);
//! controller.run(&Goal::new(0.0, 6.0, 6.0, 30.0)).await?;
//! # Ok(())
//! # }
//! ```

pub mod convergence;

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::PositionConfig;
use crate::error::ManeuverError;
use crate::link::{CommandChannel, TelemetryFeed};
use crate::transform::{euler_from_quaternion, local_offset, wrap_angle, LocalOffset};

pub use convergence::ConvergenceCounters;

/// Default horizontal acceptance radius per axis (meters)
pub const DEFAULT_POSITION_TOLERANCE_M: f64 = 0.2;

/// Default heading acceptance (degrees)
pub const DEFAULT_YAW_TOLERANCE_DEG: f64 = 1.0;

/// Target of one offset move, fixed for the duration of the run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Goal {
    /// North offset (meters)
    pub x: f64,
    /// East offset (meters)
    pub y: f64,
    /// Up offset (meters)
    pub z: f64,
    /// Target heading (degrees)
    pub yaw_deg: f64,
    /// Per-axis horizontal acceptance (meters)
    pub position_tolerance: f64,
    /// Heading acceptance (degrees)
    pub yaw_tolerance_deg: f64,
}

impl Goal {
    /// Creates a goal with the default tolerances (0.2 m, 1°).
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64, yaw_deg: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw_deg,
            position_tolerance: DEFAULT_POSITION_TOLERANCE_M,
            yaw_tolerance_deg: DEFAULT_YAW_TOLERANCE_DEG,
        }
    }

    #[must_use]
    pub fn with_position_tolerance(mut self, meters: f64) -> Self {
        self.position_tolerance = meters;
        self
    }

    #[must_use]
    pub fn with_yaw_tolerance(mut self, degrees: f64) -> Self {
        self.yaw_tolerance_deg = degrees;
        self
    }
}

/// Clamp a remaining offset to a receding step of at most `speed_factor`.
///
/// # Examples
///
/// ```
/// use uav_maneuvers::position::receding_step;
///
/// assert_eq!(receding_step(6.0, 2.0), 2.0);
/// assert_eq!(receding_step(-6.0, 2.0), -2.0);
/// assert_eq!(receding_step(1.5, 2.0), 1.5);
/// assert_eq!(receding_step(0.0, 2.0), 0.0);
/// ```
#[must_use]
pub fn receding_step(remaining: f64, speed_factor: f64) -> f64 {
    remaining.clamp(-speed_factor, speed_factor)
}

/// Closed-loop receding setpoint position controller
pub struct PositionController<'a, F, K, C> {
    feed: &'a F,
    control: &'a K,
    clock: &'a C,
    policy: &'a PositionConfig,
}

impl<'a, F, K, C> PositionController<'a, F, K, C>
where
    F: TelemetryFeed,
    K: CommandChannel,
    C: Clock,
{
    /// Creates a controller over a started attitude/position subscription.
    pub fn new(feed: &'a F, control: &'a K, clock: &'a C, policy: &'a PositionConfig) -> Self {
        Self {
            feed,
            control,
            clock,
            policy,
        }
    }

    /// Move by `goal` relative to the current position and hold it
    ///
    /// The controlled stop runs before returning on both success and timeout.
    ///
    /// # Errors
    ///
    /// - `Timeout`: the dwell was not completed within the configured ceiling
    pub async fn run(&self, goal: &Goal) -> Result<(), ManeuverError> {
        let cycle = self.policy.cycle_time();
        let ceiling = self.policy.timeout();
        let speed_factor = self.policy.speed_factor_m;

        let yaw_desired = goal.yaw_deg.to_radians();
        let yaw_tolerance = goal.yaw_tolerance_deg.to_radians();
        let yaw_cmd = yaw_desired.to_degrees();

        let origin = self.feed.fused_position();
        let start = local_offset(&origin, &origin);

        let mut x_cmd = receding_step(goal.x - start.x, speed_factor);
        let mut y_cmd = receding_step(goal.y - start.y, speed_factor);
        let z_cmd = origin.altitude + goal.z;

        let mut counters =
            ConvergenceCounters::new(self.policy.out_of_bounds_limit_cycles, self.policy.dwell_cycles);
        let mut elapsed = Duration::ZERO;

        info!(
            "Moving by ({:.2}, {:.2}, {:.2}) m to yaw {:.1}°",
            goal.x, goal.y, goal.z, goal.yaw_deg
        );

        let outcome = loop {
            if elapsed >= ceiling {
                break Err(ManeuverError::Timeout { elapsed });
            }

            self.control.set_position_yaw(x_cmd, y_cmd, z_cmd, yaw_cmd).await;
            self.clock.sleep(cycle).await;
            elapsed += cycle;

            let yaw = euler_from_quaternion(&self.feed.quaternion()).yaw;
            let offset = local_offset(&self.feed.fused_position(), &origin);
            let remaining = LocalOffset::new(goal.x - offset.x, goal.y - offset.y, goal.z - offset.z);

            // Precision mode per axis once inside one receding step
            if remaining.x.abs() < speed_factor {
                x_cmd = remaining.x;
            }
            if remaining.y.abs() < speed_factor {
                y_cmd = remaining.y;
            }

            let yaw_error = wrap_angle(yaw - yaw_desired);
            let within_bounds = remaining.x.abs() < goal.position_tolerance
                && remaining.y.abs() < goal.position_tolerance
                && remaining.z.abs() < self.policy.z_deadband_m
                && yaw_error.abs() < yaw_tolerance;

            debug!(
                "remaining=({:.3}, {:.3}, {:.3}) yaw_err={:.4} dwell={} excursion={}",
                remaining.x,
                remaining.y,
                remaining.z,
                yaw_error,
                counters.within_bounds(),
                counters.out_of_bounds()
            );

            if counters.record(within_bounds) {
                break Ok(());
            }
        };

        match &outcome {
            Ok(()) => info!("Position reached after {:?}", elapsed),
            Err(e) => warn!("Task timeout! {}", e),
        }

        self.controlled_stop(cycle).await;
        outcome
    }

    /// Brake for the convergence dwell to cancel residual velocity.
    async fn controlled_stop(&self, cycle: Duration) {
        for _ in 0..self.policy.dwell_cycles {
            self.control.brake().await;
            self.clock.sleep(cycle).await;
        }
        debug!("Controlled stop complete ({} brake commands)", self.policy.dwell_cycles);
    }
}
