//! # Simulated Vehicle
//!
//! In-process stand-in for the vehicle link and flight controller.
//!
//! [`SimulatedVehicle`] implements [`TelemetryFeed`], [`CommandChannel`] and
//! [`Clock`]: every `sleep` advances simulated time and the vehicle
//! kinematics, so maneuvers run against it in virtual time. With
//! `realtime` set it also waits on the wall clock, for demos.
//!
//! ## Flight Controller Timeline
//!
//! | Phase | Status | Mode | Exit |
//! |-------|--------|------|------|
//! | Landed | on ground | P-GPS | takeoff accepted |
//! | Engine start | on ground | engine-start | after `engine_start_ms` |
//! | Taking off | in air | auto-takeoff | reached `takeoff_altitude_m` |
//! | Hovering | in air | P-GPS | landing accepted |
//! | Landing | in air | P-GPS, then auto-landing after `landing_delay_ms` | touchdown |
//!
//! ## Kinematics
//!
//! While hovering, x/y setpoints are relative to the position at receipt
//! and tracked at up to `max_speed_mps`; z is an absolute altitude tracked
//! at `climb_rate_mps`; yaw turns at `yaw_rate_dps` along the short way.
//! A brake holds the current position.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::{SimConfig, SUPPORTED_RATES_HZ};
use crate::link::{
    Ack, CommandChannel, DisplayMode, FlightStatus, PackageHandle, TelemetryFeed, Topic,
};
use crate::transform::{quaternion_from_yaw, wrap_angle, GeodeticPosition, LocalOffset, Quaternion};

/// Largest physics step taken inside one sleep
const MAX_STEP: Duration = Duration::from_millis(20);

/// Position/yaw setpoint as received by the simulator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Setpoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Landed,
    EngineStart { since: Duration },
    TakingOff,
    Hovering,
    Landing { since: Duration },
}

/// Horizontal/vertical/heading target in the home-anchored local frame
#[derive(Debug, Clone, Copy)]
struct Target {
    position: LocalOffset,
    yaw: f64,
}

#[derive(Debug)]
struct Package {
    topics: Vec<Topic>,
    started: bool,
}

#[derive(Debug)]
struct SimState {
    now: Duration,
    phase: Phase,
    position: LocalOffset,
    yaw: f64,
    target: Option<Target>,
    next_handle: u32,
    packages: HashMap<PackageHandle, Package>,
    remove_requests: Vec<PackageHandle>,
    setpoints: Vec<Setpoint>,
    brakes: u32,
    unsubscribed_reads: u32,
    authority: bool,
}

/// Simulated flight controller reachable through the link traits
#[derive(Debug)]
pub struct SimulatedVehicle {
    config: SimConfig,
    home: GeodeticPosition,
    state: Mutex<SimState>,
}

impl SimulatedVehicle {
    /// Creates a landed vehicle at the configured home position.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let home = GeodeticPosition::new(
            config.home_latitude_deg.to_radians(),
            config.home_longitude_deg.to_radians(),
            config.home_altitude_m,
        );

        Self {
            config,
            home,
            state: Mutex::new(SimState {
                now: Duration::ZERO,
                phase: Phase::Landed,
                position: LocalOffset::default(),
                yaw: 0.0,
                target: None,
                next_handle: 0,
                packages: HashMap::new(),
                remove_requests: Vec::new(),
                setpoints: Vec::new(),
                brakes: 0,
                unsubscribed_reads: 0,
                authority: false,
            }),
        }
    }

    /// Puts the vehicle in a P-GPS hover `altitude_m` above home.
    pub fn place_airborne(&self, altitude_m: f64) {
        let mut state = self.state();
        state.phase = Phase::Hovering;
        state.position = LocalOffset::new(0.0, 0.0, altitude_m);
        state.target = None;
    }

    /// Simulated time since creation
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.state().now
    }

    /// Position relative to home (north, east, up)
    #[must_use]
    pub fn local_position(&self) -> LocalOffset {
        self.state().position
    }

    /// Current attitude (level, with the simulated heading)
    #[must_use]
    pub fn attitude(&self) -> Quaternion {
        quaternion_from_yaw(self.state().yaw)
    }

    /// Every position/yaw setpoint received so far
    #[must_use]
    pub fn setpoints(&self) -> Vec<Setpoint> {
        self.state().setpoints.clone()
    }

    /// Number of brake commands received
    #[must_use]
    pub fn brake_count(&self) -> u32 {
        self.state().brakes
    }

    /// Handles passed to `remove_package`, in call order
    #[must_use]
    pub fn remove_requests(&self) -> Vec<PackageHandle> {
        self.state().remove_requests.clone()
    }

    /// Packages allocated and not yet removed
    #[must_use]
    pub fn live_packages(&self) -> usize {
        self.state().packages.len()
    }

    /// Telemetry reads of a topic no started package carried
    #[must_use]
    pub fn unsubscribed_reads(&self) -> u32 {
        self.state().unsubscribed_reads
    }

    /// Whether control authority has been granted
    #[must_use]
    pub fn has_authority(&self) -> bool {
        self.state().authority
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self, topic: Topic) -> MutexGuard<'_, SimState> {
        let mut state = self.state();
        let subscribed = state
            .packages
            .values()
            .any(|p| p.started && p.topics.contains(&topic));
        if !subscribed {
            state.unsubscribed_reads += 1;
        }
        state
    }

    fn advance(&self, duration: Duration) {
        let mut state = self.state();
        let mut remaining = duration;
        while !remaining.is_zero() {
            let dt = remaining.min(MAX_STEP);
            self.step(&mut state, dt);
            remaining -= dt;
        }
    }

    fn step(&self, state: &mut SimState, dt: Duration) {
        state.now += dt;
        let secs = dt.as_secs_f64();
        let faults = &self.config.faults;

        match state.phase {
            Phase::Landed => {}
            Phase::EngineStart { since } => {
                if state.now - since >= Duration::from_millis(self.config.engine_start_ms) {
                    debug!("sim: lift-off at {:?}", state.now);
                    state.phase = Phase::TakingOff;
                }
            }
            Phase::TakingOff => {
                if faults.stuck_on_ground {
                    return;
                }
                let climb = self.config.takeoff_rate_mps * secs;
                let remaining = self.config.takeoff_altitude_m - state.position.z;
                if remaining > climb + 1e-9 {
                    state.position.z += climb;
                } else {
                    state.position.z = self.config.takeoff_altitude_m;
                    debug!("sim: takeoff complete at {:?}", state.now);
                    state.phase = Phase::Hovering;
                    state.target = None;
                }
            }
            Phase::Hovering => {
                if !faults.frozen {
                    self.track_target(state, secs);
                }
            }
            Phase::Landing { since } => {
                if state.now - since < Duration::from_millis(self.config.landing_delay_ms) {
                    return;
                }
                state.position.z = (state.position.z - self.config.landing_rate_mps * secs).max(0.0);
                if state.position.z <= 0.0 {
                    debug!("sim: touchdown at {:?}", state.now);
                    state.phase = Phase::Landed;
                    state.target = None;
                }
            }
        }
    }

    fn track_target(&self, state: &mut SimState, secs: f64) {
        let Some(target) = state.target else {
            return;
        };

        let dx = target.position.x - state.position.x;
        let dy = target.position.y - state.position.y;
        let distance = dx.hypot(dy);
        let max_move = self.config.max_speed_mps * secs;
        if distance <= max_move {
            state.position.x = target.position.x;
            state.position.y = target.position.y;
        } else {
            state.position.x += dx / distance * max_move;
            state.position.y += dy / distance * max_move;
        }

        let dz = target.position.z - state.position.z;
        let max_climb = self.config.climb_rate_mps * secs;
        state.position.z += dz.clamp(-max_climb, max_climb);

        let dyaw = wrap_angle(target.yaw - state.yaw);
        let max_turn = self.config.yaw_rate_dps.to_radians() * secs;
        state.yaw = wrap_angle(state.yaw + dyaw.clamp(-max_turn, max_turn));
    }

    fn status_and_mode(&self, phase: Phase, now: Duration) -> (FlightStatus, DisplayMode) {
        match phase {
            Phase::Landed => (FlightStatus::OnGround, DisplayMode::PGps),
            Phase::EngineStart { .. } => (FlightStatus::OnGround, DisplayMode::EngineStart),
            Phase::TakingOff => (FlightStatus::InAir, DisplayMode::AutoTakeoff),
            Phase::Hovering if self.config.faults.settle_in_manual => {
                (FlightStatus::InAir, DisplayMode::Manual)
            }
            Phase::Hovering => (FlightStatus::InAir, DisplayMode::PGps),
            Phase::Landing { since } => {
                if now - since < Duration::from_millis(self.config.landing_delay_ms) {
                    (FlightStatus::InAir, DisplayMode::PGps)
                } else {
                    (FlightStatus::InAir, DisplayMode::AutoLanding)
                }
            }
        }
    }
}

#[async_trait]
impl TelemetryFeed for SimulatedVehicle {
    async fn verify(&self, _timeout: Duration) -> Ack {
        if self.config.faults.link_not_ready {
            Ack::Timeout
        } else {
            Ack::Success
        }
    }

    async fn init_package(
        &self,
        topics: &[Topic],
        rate_hz: u16,
        _with_timestamp: bool,
    ) -> Result<PackageHandle, Ack> {
        if self.config.faults.package_init_fails
            || topics.is_empty()
            || !SUPPORTED_RATES_HZ.contains(&rate_hz)
        {
            return Err(Ack::InvalidParameter);
        }

        let mut state = self.state();
        let handle = PackageHandle(state.next_handle);
        state.next_handle += 1;
        state.packages.insert(
            handle,
            Package {
                topics: topics.to_vec(),
                started: false,
            },
        );
        debug!("sim: {} initialized with {:?} at {} Hz", handle, topics, rate_hz);
        Ok(handle)
    }

    async fn start_package(&self, handle: PackageHandle, _timeout: Duration) -> Ack {
        if self.config.faults.package_start_fails {
            return Ack::Timeout;
        }

        match self.state().packages.get_mut(&handle) {
            Some(package) => {
                package.started = true;
                Ack::Success
            }
            None => Ack::InvalidParameter,
        }
    }

    async fn remove_package(&self, handle: PackageHandle, _timeout: Duration) -> Ack {
        let mut state = self.state();
        state.remove_requests.push(handle);

        if self.config.faults.package_remove_fails {
            return Ack::Timeout;
        }

        match state.packages.remove(&handle) {
            Some(_) => Ack::Success,
            None => Ack::InvalidParameter,
        }
    }

    fn flight_status(&self) -> FlightStatus {
        let state = self.read(Topic::FlightStatus);
        self.status_and_mode(state.phase, state.now).0
    }

    fn display_mode(&self) -> DisplayMode {
        let state = self.read(Topic::DisplayMode);
        self.status_and_mode(state.phase, state.now).1
    }

    fn fused_position(&self) -> GeodeticPosition {
        let state = self.read(Topic::FusedPosition);
        self.home.displaced(&state.position)
    }

    fn quaternion(&self) -> Quaternion {
        let state = self.read(Topic::Quaternion);
        quaternion_from_yaw(state.yaw)
    }
}

#[async_trait]
impl CommandChannel for SimulatedVehicle {
    async fn obtain_control_authority(&self, _timeout: Duration) -> Ack {
        if self.config.faults.deny_authority {
            return Ack::NoAuthority;
        }

        self.state().authority = true;
        Ack::Success
    }

    async fn takeoff(&self, _timeout: Duration) -> Ack {
        let faults = self.config.faults;
        let mut state = self.state();

        if faults.reject_takeoff {
            return Ack::from_code(self.config.nack_code);
        }
        if state.phase != Phase::Landed {
            return Ack::Rejected;
        }

        if !faults.motors_never_start {
            state.phase = Phase::EngineStart { since: state.now };
        }
        info!("sim: takeoff accepted at {:?}", state.now);
        Ack::Success
    }

    async fn land(&self, _timeout: Duration) -> Ack {
        let faults = self.config.faults;
        let mut state = self.state();

        if faults.reject_land {
            return Ack::from_code(self.config.nack_code);
        }
        if state.phase != Phase::Hovering {
            return Ack::Rejected;
        }

        if !faults.landing_never_starts {
            state.phase = Phase::Landing { since: state.now };
            state.target = None;
        }
        info!("sim: landing accepted at {:?}", state.now);
        Ack::Success
    }

    async fn set_position_yaw(&self, x: f64, y: f64, z: f64, yaw_deg: f64) {
        let home_altitude = self.home.altitude;
        let mut state = self.state();
        state.setpoints.push(Setpoint { x, y, z, yaw_deg });

        if state.phase == Phase::Hovering {
            let position = LocalOffset::new(
                state.position.x + x,
                state.position.y + y,
                z - home_altitude,
            );
            state.target = Some(Target {
                position,
                yaw: yaw_deg.to_radians(),
            });
        }
    }

    async fn brake(&self) {
        let mut state = self.state();
        state.brakes += 1;
        let hold = Target {
            position: state.position,
            yaw: state.yaw,
        };
        state.target = Some(hold);
    }
}

#[async_trait]
impl Clock for SimulatedVehicle {
    async fn sleep(&self, duration: Duration) {
        if self.config.realtime {
            tokio::time::sleep(duration).await;
        }
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimFaults;
    use crate::link::STATUS_TOPICS;
    use crate::transform::{euler_from_quaternion, local_offset};

    fn vehicle() -> SimulatedVehicle {
        SimulatedVehicle::new(SimConfig::default())
    }

    fn with_faults(faults: SimFaults) -> SimulatedVehicle {
        SimulatedVehicle::new(SimConfig {
            faults,
            ..SimConfig::default()
        })
    }

    #[tokio::test]
    async fn test_starts_landed_at_home() {
        let sim = vehicle();
        assert_eq!(sim.flight_status(), FlightStatus::OnGround);
        assert_eq!(sim.display_mode(), DisplayMode::PGps);
        assert_eq!(sim.local_position(), LocalOffset::default());
        assert_eq!(sim.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_takeoff_timeline() {
        let sim = vehicle();
        assert_eq!(sim.takeoff(Duration::from_secs(1)).await, Ack::Success);
        assert_eq!(sim.display_mode(), DisplayMode::EngineStart);

        sim.sleep(Duration::from_millis(1000)).await;
        assert_eq!(sim.flight_status(), FlightStatus::InAir);
        assert_eq!(sim.display_mode(), DisplayMode::AutoTakeoff);

        // 1.2 m at 0.5 m/s
        sim.sleep(Duration::from_millis(2400)).await;
        assert_eq!(sim.display_mode(), DisplayMode::PGps);
        assert!((sim.local_position().z - 1.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_takeoff_rejected_when_airborne() {
        let sim = vehicle();
        sim.place_airborne(3.0);
        assert_eq!(sim.takeoff(Duration::from_secs(1)).await, Ack::Rejected);
    }

    #[tokio::test]
    async fn test_landing_timeline() {
        let sim = vehicle();
        sim.place_airborne(0.8);
        assert_eq!(sim.land(Duration::from_secs(1)).await, Ack::Success);
        assert_eq!(sim.display_mode(), DisplayMode::PGps);

        sim.sleep(Duration::from_millis(300)).await;
        assert_eq!(sim.display_mode(), DisplayMode::AutoLanding);

        sim.sleep(Duration::from_millis(1000)).await;
        assert_eq!(sim.flight_status(), FlightStatus::OnGround);
        assert_eq!(sim.display_mode(), DisplayMode::PGps);
    }

    #[tokio::test]
    async fn test_setpoint_is_relative_horizontally_and_absolute_vertically() {
        let sim = vehicle();
        sim.place_airborne(2.0);
        let origin = sim.fused_position();

        sim.set_position_yaw(1.0, -1.0, origin.altitude + 1.0, 90.0).await;
        sim.sleep(Duration::from_secs(2)).await;

        let offset = local_offset(&sim.fused_position(), &origin);
        assert!((offset.x - 1.0).abs() < 1e-6);
        assert!((offset.y + 1.0).abs() < 1e-3);
        assert!((offset.z - 1.0).abs() < 1e-9);
        let yaw = euler_from_quaternion(&sim.quaternion()).yaw;
        assert!((yaw.to_degrees() - 90.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_speed_is_bounded() {
        let sim = vehicle();
        sim.place_airborne(2.0);
        sim.set_position_yaw(10.0, 0.0, sim.fused_position().altitude, 0.0).await;
        sim.sleep(Duration::from_secs(1)).await;
        assert!((sim.local_position().x - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_brake_holds_position() {
        let sim = vehicle();
        sim.place_airborne(2.0);
        sim.set_position_yaw(10.0, 0.0, sim.fused_position().altitude, 0.0).await;
        sim.sleep(Duration::from_millis(500)).await;
        sim.brake().await;
        let held = sim.local_position();
        sim.sleep(Duration::from_secs(1)).await;

        assert_eq!(sim.local_position(), held);
        assert_eq!(sim.brake_count(), 1);
    }

    #[tokio::test]
    async fn test_package_lifecycle() {
        let sim = vehicle();
        let handle = sim.init_package(STATUS_TOPICS, 10, false).await.unwrap();
        assert_eq!(sim.live_packages(), 1);

        // Not started yet: reads are flagged
        let _ = sim.flight_status();
        assert_eq!(sim.unsubscribed_reads(), 1);

        assert_eq!(sim.start_package(handle, Duration::from_secs(1)).await, Ack::Success);
        let _ = sim.flight_status();
        let _ = sim.display_mode();
        assert_eq!(sim.unsubscribed_reads(), 1);

        // Position is not part of the status package
        let _ = sim.fused_position();
        assert_eq!(sim.unsubscribed_reads(), 2);

        assert_eq!(sim.remove_package(handle, Duration::from_secs(1)).await, Ack::Success);
        assert_eq!(sim.live_packages(), 0);
        assert_eq!(sim.remove_requests(), vec![handle]);
        assert_eq!(
            sim.remove_package(handle, Duration::from_secs(1)).await,
            Ack::InvalidParameter
        );
    }

    #[tokio::test]
    async fn test_package_handles_are_unique() {
        let sim = vehicle();
        let a = sim.init_package(STATUS_TOPICS, 10, false).await.unwrap();
        let b = sim.init_package(STATUS_TOPICS, 10, false).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_unsupported_rate_is_rejected() {
        let sim = vehicle();
        assert_eq!(
            sim.init_package(STATUS_TOPICS, 7, false).await,
            Err(Ack::InvalidParameter)
        );
    }

    #[tokio::test]
    async fn test_faults() {
        let sim = with_faults(SimFaults {
            link_not_ready: true,
            reject_takeoff: true,
            package_start_fails: true,
            ..SimFaults::default()
        });
        assert_eq!(sim.verify(Duration::from_secs(1)).await, Ack::Timeout);
        assert_eq!(sim.takeoff(Duration::from_secs(1)).await, Ack::Rejected);

        let handle = sim.init_package(STATUS_TOPICS, 10, false).await.unwrap();
        assert_eq!(sim.start_package(handle, Duration::from_secs(1)).await, Ack::Timeout);
    }

    #[tokio::test]
    async fn test_control_authority() {
        let sim = vehicle();
        assert!(!sim.has_authority());
        assert_eq!(sim.obtain_control_authority(Duration::from_secs(1)).await, Ack::Success);
        assert!(sim.has_authority());

        let denied = with_faults(SimFaults {
            deny_authority: true,
            ..SimFaults::default()
        });
        assert_eq!(
            denied.obtain_control_authority(Duration::from_secs(1)).await,
            Ack::NoAuthority
        );
        assert!(!denied.has_authority());
    }

    #[tokio::test]
    async fn test_refusals_use_configured_code() {
        let sim = SimulatedVehicle::new(SimConfig {
            nack_code: 5,
            faults: SimFaults {
                reject_land: true,
                ..SimFaults::default()
            },
            ..SimConfig::default()
        });
        sim.place_airborne(2.0);
        assert_eq!(sim.land(Duration::from_secs(1)).await, Ack::MotorFailure);
    }

    #[tokio::test]
    async fn test_frozen_vehicle_ignores_setpoints() {
        let sim = with_faults(SimFaults {
            frozen: true,
            ..SimFaults::default()
        });
        sim.place_airborne(2.0);
        sim.set_position_yaw(1.0, 1.0, 0.0, 45.0).await;
        sim.sleep(Duration::from_secs(3)).await;
        assert_eq!(sim.local_position(), LocalOffset::new(0.0, 0.0, 2.0));
        assert_eq!(sim.setpoints().len(), 1);
    }
}
