//! # Maneuver Orchestrator
//!
//! Public takeoff, landing and offset-move operations.
//!
//! Each operation:
//! 1. Verifies the telemetry link (`LinkNotReady` on failure)
//! 2. Allocates and starts the telemetry package its phase needs
//!    (status + mode for takeoff/landing, attitude + position for moves)
//! 3. Delegates to the [`FlightStateMonitor`] or the [`PositionController`]
//! 4. Removes the package on every exit path
//!
//! A package removal failure is logged as a warning and never replaces the
//! maneuver outcome. Calls must be serialized: one maneuver, one package and
//! one set of convergence counters at a time.

use std::time::Duration;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::config::Config;
use crate::error::{LandingError, ManeuverError, MoveError, SubscriptionStage, TakeoffError};
use crate::link::{
    Command, CommandChannel, PackageHandle, TelemetryFeed, Topic, POSITION_TOPICS, STATUS_TOPICS,
};
use crate::monitor::FlightStateMonitor;
use crate::position::{Goal, PositionController};

/// Sequencer for monitored maneuvers over one vehicle link
pub struct Maneuvers<'a, F, K, C> {
    feed: &'a F,
    control: &'a K,
    clock: &'a C,
    config: &'a Config,
}

impl<'a, F, K, C> Maneuvers<'a, F, K, C>
where
    F: TelemetryFeed,
    K: CommandChannel,
    C: Clock,
{
    /// Creates the orchestrator.
    ///
    /// # Arguments
    ///
    /// * `feed` - Telemetry side of the vehicle link
    /// * `control` - Command side of the vehicle link
    /// * `clock` - Time source for every inter-cycle wait
    /// * `config` - Validated configuration
    pub fn new(feed: &'a F, control: &'a K, clock: &'a C, config: &'a Config) -> Self {
        Self {
            feed,
            control,
            clock,
            config,
        }
    }

    /// Configuration the maneuvers run with
    pub fn config(&self) -> &'a Config {
        self.config
    }

    /// Take control authority before any maneuver
    ///
    /// # Errors
    ///
    /// `ActuationRejected` for `Command::ObtainAuthority` when refused.
    pub async fn obtain_control_authority(&self, timeout: Duration) -> Result<(), ManeuverError> {
        let ack = self.control.obtain_control_authority(timeout).await;
        if ack.is_success() {
            info!("Obtained control authority");
            Ok(())
        } else {
            let e = ManeuverError::ActuationRejected {
                command: Command::ObtainAuthority,
                ack,
            };
            error!("{} ({})", e, e.hint());
            Err(e)
        }
    }

    /// Monitored takeoff
    ///
    /// Returns once the vehicle is airborne and holding a stable mode.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Acknowledgement timeout for link requests
    ///
    /// # Errors
    ///
    /// `LinkNotReady`, `SubscriptionFailed`, `ActuationRejected`,
    /// `MotorsNotStarted`, `StillOnGround`, `PhaseTimeout` or `UnexpectedMode`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use uav_maneuvers::config::Config;
    /// use uav_maneuvers::maneuver::Maneuvers;
    /// use uav_maneuvers::sim::SimulatedVehicle;
    ///
    /// # tokio_test::block_on(async {
    /// let config = Config::default();
    /// let vehicle = SimulatedVehicle::new(config.sim.clone());
    /// let maneuvers = Maneuvers::new(&vehicle, &vehicle, &vehicle, &config);
    ///
    /// maneuvers.takeoff(Duration::from_secs(1)).await.unwrap();
    /// maneuvers.landing(Duration::from_secs(1)).await.unwrap();
    /// # });
    /// ```
    pub async fn takeoff(&self, timeout: Duration) -> Result<(), TakeoffError> {
        info!("Takeoff requested");
        self.ensure_ready(timeout).await?;
        let handle = self
            .open_package(STATUS_TOPICS, self.config.monitor.status_rate_hz, timeout)
            .await?;

        let monitor = FlightStateMonitor::new(self.feed, self.control, self.clock, &self.config.monitor);
        let outcome = monitor.confirm_takeoff(timeout).await;

        self.close_package(handle, timeout).await;
        log_outcome("takeoff", &outcome);
        outcome
    }

    /// Monitored landing
    ///
    /// Returns once the vehicle has touched down in a stable mode.
    ///
    /// # Errors
    ///
    /// `LinkNotReady`, `SubscriptionFailed`, `ActuationRejected`,
    /// `LandingNotStarted`, `PhaseTimeout` or `UnexpectedMode`.
    pub async fn landing(&self, timeout: Duration) -> Result<(), LandingError> {
        info!("Landing requested");
        self.ensure_ready(timeout).await?;
        let handle = self
            .open_package(STATUS_TOPICS, self.config.monitor.status_rate_hz, timeout)
            .await?;

        let monitor = FlightStateMonitor::new(self.feed, self.control, self.clock, &self.config.monitor);
        let outcome = monitor.confirm_landing(timeout).await;

        self.close_package(handle, timeout).await;
        log_outcome("landing", &outcome);
        outcome
    }

    /// Move by a local offset with the configured default tolerances
    ///
    /// # Arguments
    ///
    /// * `x`, `y` - North/east offset in meters
    /// * `z` - Altitude change in meters (up positive)
    /// * `yaw_deg` - Target heading in degrees
    ///
    /// # Errors
    ///
    /// `LinkNotReady`, `SubscriptionFailed` or `Timeout`.
    pub async fn move_to_offset(&self, x: f64, y: f64, z: f64, yaw_deg: f64) -> Result<(), MoveError> {
        let goal = Goal::new(x, y, z, yaw_deg)
            .with_position_tolerance(self.config.position.position_tolerance_m)
            .with_yaw_tolerance(self.config.position.yaw_tolerance_deg);
        self.move_to(&goal).await
    }

    /// Move to `goal` with its own tolerances
    ///
    /// # Errors
    ///
    /// `LinkNotReady`, `SubscriptionFailed` or `Timeout`.
    pub async fn move_to(&self, goal: &Goal) -> Result<(), MoveError> {
        let timeout = self.config.link.response_timeout();
        self.ensure_ready(timeout).await?;
        let handle = self
            .open_package(POSITION_TOPICS, self.config.position.control_rate_hz, timeout)
            .await?;

        // Let the first samples arrive before the origin is captured
        self.clock.sleep(self.config.link.warmup()).await;

        let controller = PositionController::new(self.feed, self.control, self.clock, &self.config.position);
        let outcome = controller.run(goal).await;

        self.close_package(handle, timeout).await;
        log_outcome("move", &outcome);
        outcome
    }

    async fn ensure_ready(&self, timeout: Duration) -> Result<(), ManeuverError> {
        let ack = self.feed.verify(timeout).await;
        if ack.is_success() {
            Ok(())
        } else {
            error!("Telemetry link not ready: {}", ack);
            Err(ManeuverError::LinkNotReady(ack))
        }
    }

    /// Init and start a package; a package that initialized but failed to
    /// start is removed before returning.
    async fn open_package(
        &self,
        topics: &[Topic],
        rate_hz: u16,
        timeout: Duration,
    ) -> Result<PackageHandle, ManeuverError> {
        let handle = self
            .feed
            .init_package(topics, rate_hz, false)
            .await
            .map_err(|ack| {
                error!("Failed to init telemetry package {:?} at {} Hz: {}", topics, rate_hz, ack);
                ManeuverError::SubscriptionFailed {
                    stage: SubscriptionStage::Init,
                    ack,
                }
            })?;

        let ack = self.feed.start_package(handle, timeout).await;
        if !ack.is_success() {
            error!("Failed to start {}: {}", handle, ack);
            self.close_package(handle, timeout).await;
            return Err(ManeuverError::SubscriptionFailed {
                stage: SubscriptionStage::Start,
                ack,
            });
        }

        info!("Subscribed to {:?} at {} Hz ({})", topics, rate_hz, handle);
        Ok(handle)
    }

    async fn close_package(&self, handle: PackageHandle, timeout: Duration) {
        let ack = self.feed.remove_package(handle, timeout).await;
        if !ack.is_success() {
            warn!(
                "Error unsubscribing {}: {}; restart the drone/FC to get back to a clean state",
                handle, ack
            );
        }
    }
}

fn log_outcome(maneuver: &str, outcome: &Result<(), ManeuverError>) {
    if let Err(e) = outcome {
        error!("{} failed: {} ({})", maneuver, e, e.hint());
    }
}
