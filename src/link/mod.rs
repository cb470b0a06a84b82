//! # Vehicle Link Module
//!
//! Interface to the already-correct vehicle-link layer that owns the
//! telemetry transport and the command channel.
//!
//! This module defines:
//! - [`TelemetryFeed`]: subscription package lifecycle and latest-value reads
//! - [`CommandChannel`]: control authority, takeoff, landing, position/yaw
//!   setpoints and brake
//! - The acknowledgement type shared by both
//!
//! Both traits are object-safe async seams so the maneuver logic can run
//! against a real flight controller link, the in-process simulator, or a
//! mock in tests.

pub mod ack;
pub mod types;

use async_trait::async_trait;
use std::time::Duration;

use crate::transform::{GeodeticPosition, Quaternion};

pub use ack::Ack;
pub use types::{
    Command, DisplayMode, FlightStatus, PackageHandle, Topic, POSITION_TOPICS, STATUS_TOPICS,
};

/// Telemetry side of the vehicle link
///
/// Reads are non-blocking and return the most recent sample for a topic.
/// A package carrying the topic must be started before reading it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetryFeed: Send + Sync {
    /// Confirm the telemetry capability is ready
    async fn verify(&self, timeout: Duration) -> Ack;

    /// Allocate a package for `topics` published at `rate_hz`
    ///
    /// Returns the handle owned by the caller, or the failure acknowledgement.
    async fn init_package(
        &self,
        topics: &[Topic],
        rate_hz: u16,
        with_timestamp: bool,
    ) -> Result<PackageHandle, Ack>;

    /// Start publishing an initialized package
    async fn start_package(&self, handle: PackageHandle, timeout: Duration) -> Ack;

    /// Stop and release a package
    async fn remove_package(&self, handle: PackageHandle, timeout: Duration) -> Ack;

    /// Latest flight status sample
    fn flight_status(&self) -> FlightStatus;

    /// Latest display mode sample
    fn display_mode(&self) -> DisplayMode;

    /// Latest fused geodetic position
    fn fused_position(&self) -> GeodeticPosition;

    /// Latest attitude quaternion
    fn quaternion(&self) -> Quaternion;
}

/// Actuation side of the vehicle link
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Take control authority from the remote controller
    async fn obtain_control_authority(&self, timeout: Duration) -> Ack;

    /// Request an automatic takeoff
    async fn takeoff(&self, timeout: Duration) -> Ack;

    /// Request an automatic landing
    async fn land(&self, timeout: Duration) -> Ack;

    /// Send a position/yaw setpoint
    ///
    /// `x` and `y` are meters relative to the current position (north, east),
    /// `z` is the absolute target altitude in meters and `yaw_deg` the target
    /// heading in degrees.
    async fn set_position_yaw(&self, x: f64, y: f64, z: f64, yaw_deg: f64);

    /// Command zero velocity (emergency brake)
    async fn brake(&self);
}
