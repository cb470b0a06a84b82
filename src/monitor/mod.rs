//! # Flight State Monitor
//!
//! Confirms that a commanded takeoff or landing actually reaches its
//! physical checkpoints by polling flight status and display mode.
//!
//! ## Takeoff Phases
//!
//! | Phase | Poll | Budget | Done when | Failure |
//! |-------|------|--------|-----------|---------|
//! | Motors spinning | 100 ms | 20 | not on ground and past engine start | `MotorsNotStarted` |
//! | Airborne | 100 ms | 110 | in air and takeoff transition over | `StillOnGround` |
//! | Settled | 1 s | 30 | no takeoff transition mode | `PhaseTimeout` |
//!
//! ## Landing Phases
//!
//! | Phase | Poll | Budget | Done when | Failure |
//! |-------|------|--------|-----------|---------|
//! | Descent started | 100 ms | 20 | auto-landing | `LandingNotStarted` |
//! | Touchdown | 1 s | 60 | not (auto-landing and in air) | `PhaseTimeout` |
//!
//! Both maneuvers finish with a stable-mode check (P-GPS or attitude hold),
//! the only source of `UnexpectedMode`.
//! Poll intervals and budgets come from [`MonitorConfig`]; the values above
//! are the defaults.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::error::ManeuverError;
use crate::link::{Command, CommandChannel, DisplayMode, FlightStatus, TelemetryFeed};

/// One polled checkpoint of a maneuver
#[derive(Debug, Clone, Copy)]
struct Phase {
    name: &'static str,
    interval: Duration,
    max_cycles: u32,
}

impl Phase {
    fn exhausted(&self) -> ManeuverError {
        ManeuverError::PhaseTimeout {
            phase: self.name,
            cycles: self.max_cycles,
        }
    }
}

/// Polls telemetry to confirm takeoff and landing progress
pub struct FlightStateMonitor<'a, F, K, C> {
    feed: &'a F,
    control: &'a K,
    clock: &'a C,
    policy: &'a MonitorConfig,
}

impl<'a, F, K, C> FlightStateMonitor<'a, F, K, C>
where
    F: TelemetryFeed,
    K: CommandChannel,
    C: Clock,
{
    /// Creates a monitor over a started status/mode subscription.
    pub fn new(feed: &'a F, control: &'a K, clock: &'a C, policy: &'a MonitorConfig) -> Self {
        Self {
            feed,
            control,
            clock,
            policy,
        }
    }

    /// Request a takeoff and confirm it completes
    ///
    /// # Arguments
    ///
    /// * `timeout` - Acknowledgement timeout for the takeoff request
    ///
    /// # Errors
    ///
    /// - `ActuationRejected`: takeoff request not acknowledged
    /// - `MotorsNotStarted`: motors never reported active
    /// - `StillOnGround`: vehicle never confirmed airborne
    /// - `PhaseTimeout`: still in a takeoff transition mode after the settle budget
    /// - `UnexpectedMode`: takeoff finished outside a stable hold mode
    pub async fn confirm_takeoff(&self, timeout: Duration) -> Result<(), ManeuverError> {
        let ack = self.control.takeoff(timeout).await;
        if !ack.is_success() {
            return Err(ManeuverError::ActuationRejected {
                command: Command::Takeoff,
                ack,
            });
        }

        let motors = self.fast_phase("motors spinning", self.policy.motors_start_max_cycles);
        if self
            .wait_until(motors, |status, mode| {
                status != FlightStatus::OnGround && mode != DisplayMode::EngineStart
            })
            .await
            .is_none()
        {
            return Err(ManeuverError::MotorsNotStarted);
        }
        info!("Motors spinning...");

        let airborne = self.fast_phase("airborne", self.policy.airborne_max_cycles);
        if self
            .wait_until(airborne, |status, mode| {
                status == FlightStatus::InAir && !mode.is_takeoff_transition()
            })
            .await
            .is_none()
        {
            return Err(ManeuverError::StillOnGround);
        }
        info!("Ascending...");

        let settled = self.slow_phase("takeoff settled", self.policy.settle_max_cycles);
        if self
            .wait_until(settled, |_, mode| !mode.is_takeoff_transition())
            .await
            .is_none()
        {
            return Err(settled.exhausted());
        }

        self.check_stable_mode("takeoff")
    }

    /// Request a landing and confirm touchdown
    ///
    /// # Arguments
    ///
    /// * `timeout` - Acknowledgement timeout for the landing request
    ///
    /// # Errors
    ///
    /// - `ActuationRejected`: landing request not acknowledged
    /// - `LandingNotStarted`: controller never entered auto-landing
    /// - `PhaseTimeout`: no touchdown within budget
    /// - `UnexpectedMode`: landed outside a stable hold mode
    pub async fn confirm_landing(&self, timeout: Duration) -> Result<(), ManeuverError> {
        let ack = self.control.land(timeout).await;
        if !ack.is_success() {
            return Err(ManeuverError::ActuationRejected {
                command: Command::Land,
                ack,
            });
        }

        let started = self.fast_phase("descent started", self.policy.landing_start_max_cycles);
        if self
            .wait_until(started, |_, mode| mode == DisplayMode::AutoLanding)
            .await
            .is_none()
        {
            return Err(ManeuverError::LandingNotStarted);
        }
        info!("Landing...");

        let touchdown = self.slow_phase("touchdown", self.policy.touchdown_max_cycles);
        if self
            .wait_until(touchdown, |status, mode| {
                !(mode == DisplayMode::AutoLanding && status == FlightStatus::InAir)
            })
            .await
            .is_none()
        {
            return Err(touchdown.exhausted());
        }

        self.check_stable_mode("landing")
    }

    fn fast_phase(&self, name: &'static str, max_cycles: u32) -> Phase {
        Phase {
            name,
            interval: self.policy.poll_interval(),
            max_cycles,
        }
    }

    fn slow_phase(&self, name: &'static str, max_cycles: u32) -> Phase {
        Phase {
            name,
            interval: self.policy.settle_poll_interval(),
            max_cycles,
        }
    }

    /// Poll until `done` holds or the phase budget is spent.
    ///
    /// Returns the number of sleeps taken, or `None` on exhaustion.
    async fn wait_until<P>(&self, phase: Phase, done: P) -> Option<u32>
    where
        P: Fn(FlightStatus, DisplayMode) -> bool,
    {
        for cycle in 0..=phase.max_cycles {
            let status = self.feed.flight_status();
            let mode = self.feed.display_mode();

            if done(status, mode) {
                debug!("Phase '{}' reached after {} cycles", phase.name, cycle);
                return Some(cycle);
            }

            if cycle < phase.max_cycles {
                self.clock.sleep(phase.interval).await;
            }
        }

        warn!(
            "Phase '{}' not reached within {} cycles of {:?}",
            phase.name, phase.max_cycles, phase.interval
        );
        None
    }

    fn check_stable_mode(&self, maneuver: &str) -> Result<(), ManeuverError> {
        let mode = self.feed.display_mode();
        if mode.is_stable_hold() {
            info!("Successful {}! (mode: {})", maneuver, mode);
            Ok(())
        } else {
            warn!("{} finished, but the aircraft is in an unexpected mode: {}", maneuver, mode);
            Err(ManeuverError::UnexpectedMode(mode))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{Ack, MockCommandChannel, MockTelemetryFeed};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    /// Virtual clock counting sleeps; telemetry scripts index by it.
    #[derive(Clone, Default)]
    struct CycleClock {
        cycles: Arc<AtomicU32>,
    }

    impl CycleClock {
        fn cycles(&self) -> u32 {
            self.cycles.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Clock for CycleClock {
        async fn sleep(&self, _duration: Duration) {
            self.cycles.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Feed whose status and mode are functions of the elapsed cycle count.
    fn scripted_feed(
        clock: &CycleClock,
        script: fn(u32) -> (FlightStatus, DisplayMode),
    ) -> MockTelemetryFeed {
        let mut feed = MockTelemetryFeed::new();
        let status_clock = clock.clone();
        feed.expect_flight_status()
            .returning(move || script(status_clock.cycles()).0);
        let mode_clock = clock.clone();
        feed.expect_display_mode()
            .returning(move || script(mode_clock.cycles()).1);
        feed
    }

    fn accepting_control() -> MockCommandChannel {
        let mut control = MockCommandChannel::new();
        control.expect_takeoff().returning(|_| Ack::Success);
        control.expect_land().returning(|_| Ack::Success);
        control
    }

    fn nominal_takeoff(cycle: u32) -> (FlightStatus, DisplayMode) {
        match cycle {
            0..=9 => (FlightStatus::OnGround, DisplayMode::EngineStart),
            10..=89 => (FlightStatus::InAir, DisplayMode::AutoTakeoff),
            _ => (FlightStatus::InAir, DisplayMode::PGps),
        }
    }

    #[tokio::test]
    async fn test_takeoff_succeeds_on_nominal_stream() {
        let clock = CycleClock::default();
        let feed = scripted_feed(&clock, nominal_takeoff);
        let control = accepting_control();
        let policy = MonitorConfig::default();

        let monitor = FlightStateMonitor::new(&feed, &control, &clock, &policy);
        assert_ok!(monitor.confirm_takeoff(Duration::from_secs(1)).await);
        assert_eq!(clock.cycles(), 90);
    }

    #[tokio::test]
    async fn test_takeoff_motors_not_started_when_stuck_on_ground() {
        let clock = CycleClock::default();
        let feed = scripted_feed(&clock, |_| (FlightStatus::OnGround, DisplayMode::EngineStart));
        let control = accepting_control();
        let policy = MonitorConfig::default();

        let monitor = FlightStateMonitor::new(&feed, &control, &clock, &policy);
        let result = monitor.confirm_takeoff(Duration::from_secs(1)).await;
        assert_eq!(result, Err(ManeuverError::MotorsNotStarted));
        assert_eq!(clock.cycles(), 20, "motor phase should spend exactly its budget");
    }

    #[tokio::test]
    async fn test_takeoff_still_on_ground_when_climb_never_completes() {
        let clock = CycleClock::default();
        let feed = scripted_feed(&clock, |cycle| {
            if cycle < 5 {
                (FlightStatus::OnGround, DisplayMode::EngineStart)
            } else {
                (FlightStatus::InAir, DisplayMode::AutoTakeoff)
            }
        });
        let control = accepting_control();
        let policy = MonitorConfig::default();

        let monitor = FlightStateMonitor::new(&feed, &control, &clock, &policy);
        let result = monitor.confirm_takeoff(Duration::from_secs(1)).await;
        assert_eq!(result, Err(ManeuverError::StillOnGround));
        assert_eq!(clock.cycles(), 5 + 110);
    }

    #[tokio::test]
    async fn test_takeoff_unexpected_mode_after_settling() {
        let clock = CycleClock::default();
        let feed = scripted_feed(&clock, |cycle| match cycle {
            0..=3 => (FlightStatus::OnGround, DisplayMode::EngineStart),
            _ => (FlightStatus::InAir, DisplayMode::Manual),
        });
        let control = accepting_control();
        let policy = MonitorConfig::default();

        let monitor = FlightStateMonitor::new(&feed, &control, &clock, &policy);
        let result = monitor.confirm_takeoff(Duration::from_secs(1)).await;
        assert_eq!(result, Err(ManeuverError::UnexpectedMode(DisplayMode::Manual)));
    }

    #[tokio::test]
    async fn test_takeoff_rejected_skips_polling() {
        let clock = CycleClock::default();
        let feed = MockTelemetryFeed::new();
        let mut control = MockCommandChannel::new();
        control.expect_takeoff().times(1).returning(|_| Ack::NoAuthority);
        let policy = MonitorConfig::default();

        let monitor = FlightStateMonitor::new(&feed, &control, &clock, &policy);
        let result = monitor.confirm_takeoff(Duration::from_secs(1)).await;
        assert_eq!(
            result,
            Err(ManeuverError::ActuationRejected {
                command: Command::Takeoff,
                ack: Ack::NoAuthority
            })
        );
        assert_eq!(clock.cycles(), 0);
    }

    #[tokio::test]
    async fn test_landing_succeeds() {
        let clock = CycleClock::default();
        let feed = scripted_feed(&clock, |cycle| match cycle {
            0..=2 => (FlightStatus::InAir, DisplayMode::PGps),
            3..=8 => (FlightStatus::InAir, DisplayMode::AutoLanding),
            _ => (FlightStatus::OnGround, DisplayMode::PGps),
        });
        let control = accepting_control();
        let policy = MonitorConfig::default();

        let monitor = FlightStateMonitor::new(&feed, &control, &clock, &policy);
        assert_ok!(monitor.confirm_landing(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_landing_not_started() {
        let clock = CycleClock::default();
        let feed = scripted_feed(&clock, |_| (FlightStatus::InAir, DisplayMode::PGps));
        let control = accepting_control();
        let policy = MonitorConfig::default();

        let monitor = FlightStateMonitor::new(&feed, &control, &clock, &policy);
        let result = monitor.confirm_landing(Duration::from_secs(1)).await;
        assert_eq!(result, Err(ManeuverError::LandingNotStarted));
        assert_eq!(clock.cycles(), 20);
    }

    #[tokio::test]
    async fn test_landing_touchdown_budget_is_bounded() {
        let clock = CycleClock::default();
        let feed = scripted_feed(&clock, |_| (FlightStatus::InAir, DisplayMode::AutoLanding));
        let control = accepting_control();
        let policy = MonitorConfig {
            touchdown_max_cycles: 5,
            ..MonitorConfig::default()
        };

        let monitor = FlightStateMonitor::new(&feed, &control, &clock, &policy);
        let result = monitor.confirm_landing(Duration::from_secs(1)).await;
        assert_eq!(
            result,
            Err(ManeuverError::PhaseTimeout {
                phase: "touchdown",
                cycles: 5
            })
        );
        assert_eq!(clock.cycles(), 5);
    }

    #[tokio::test]
    async fn test_takeoff_settle_budget_is_bounded() {
        let clock = CycleClock::default();
        let mut feed = MockTelemetryFeed::new();
        feed.expect_flight_status().returning(|| FlightStatus::InAir);
        // Airborne is confirmed on the second mode read, then the mode drops back
        let reads = Arc::new(AtomicU32::new(0));
        feed.expect_display_mode().returning(move || {
            match reads.fetch_add(1, Ordering::SeqCst) {
                1 => DisplayMode::PGps,
                _ => DisplayMode::AutoTakeoff,
            }
        });
        let control = accepting_control();
        let policy = MonitorConfig {
            settle_max_cycles: 3,
            ..MonitorConfig::default()
        };

        let monitor = FlightStateMonitor::new(&feed, &control, &clock, &policy);
        let result = monitor.confirm_takeoff(Duration::from_secs(1)).await;
        assert_eq!(
            result,
            Err(ManeuverError::PhaseTimeout {
                phase: "takeoff settled",
                cycles: 3
            })
        );
        assert_eq!(clock.cycles(), 3);
    }

    #[tokio::test]
    async fn test_landed_in_manual_is_unexpected_mode() {
        let clock = CycleClock::default();
        let feed = scripted_feed(&clock, |cycle| match cycle {
            0..=1 => (FlightStatus::InAir, DisplayMode::AutoLanding),
            _ => (FlightStatus::OnGround, DisplayMode::Manual),
        });
        let control = accepting_control();
        let policy = MonitorConfig::default();

        let monitor = FlightStateMonitor::new(&feed, &control, &clock, &policy);
        let result = monitor.confirm_landing(Duration::from_secs(1)).await;
        assert_eq!(result, Err(ManeuverError::UnexpectedMode(DisplayMode::Manual)));
    }

    #[tokio::test]
    async fn test_landing_rejected() {
        let clock = CycleClock::default();
        let feed = MockTelemetryFeed::new();
        let mut control = MockCommandChannel::new();
        control.expect_land().times(1).returning(|_| Ack::Rejected);
        let policy = MonitorConfig::default();

        let monitor = FlightStateMonitor::new(&feed, &control, &clock, &policy);
        assert_err!(monitor.confirm_landing(Duration::from_secs(1)).await);
    }
}
