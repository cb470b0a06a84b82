//! # Telemetry Types
//!
//! Flight status, controller display mode and subscription topics as seen
//! through the vehicle link.

use std::fmt;

/// Vehicle flight status reported by the flight controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightStatus {
    /// On the ground (motors may or may not be spinning)
    OnGround,
    /// Airborne
    InAir,
}

/// Flight controller display mode
///
/// Drives every phase transition of the flight state monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    /// Manual control
    Manual,
    /// Attitude hold
    Attitude,
    /// GPS position hold (P-GPS)
    PGps,
    /// Motors spooling up before a takeoff
    EngineStart,
    /// Pilot-assisted takeoff in progress
    AssistedTakeoff,
    /// Automatic takeoff in progress
    AutoTakeoff,
    /// Automatic landing in progress
    AutoLanding,
    /// SDK/API position control
    NaviSdkCtrl,
    /// Return to home
    GoHome,
    /// Forced landing (e.g. low battery)
    ForceAutoLanding,
}

impl DisplayMode {
    /// True while the controller is still executing a takeoff.
    ///
    /// # Examples
    ///
    /// ```
    /// use uav_maneuvers::link::DisplayMode;
    ///
    /// assert!(DisplayMode::AutoTakeoff.is_takeoff_transition());
    /// assert!(!DisplayMode::PGps.is_takeoff_transition());
    /// ```
    #[must_use]
    pub fn is_takeoff_transition(self) -> bool {
        matches!(self, Self::AssistedTakeoff | Self::AutoTakeoff)
    }

    /// True for the hold modes a completed takeoff or landing settles into.
    #[must_use]
    pub fn is_stable_hold(self) -> bool {
        matches!(self, Self::PGps | Self::Attitude)
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Manual => "manual",
            Self::Attitude => "attitude",
            Self::PGps => "P-GPS",
            Self::EngineStart => "engine-start",
            Self::AssistedTakeoff => "assisted-takeoff",
            Self::AutoTakeoff => "auto-takeoff",
            Self::AutoLanding => "auto-landing",
            Self::NaviSdkCtrl => "sdk-control",
            Self::GoHome => "go-home",
            Self::ForceAutoLanding => "forced-landing",
        };
        f.write_str(name)
    }
}

/// Telemetry topics a subscription package can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    FlightStatus,
    DisplayMode,
    FusedPosition,
    Quaternion,
}

/// Topics the flight state monitor reads (10 Hz by default)
pub const STATUS_TOPICS: &[Topic] = &[Topic::FlightStatus, Topic::DisplayMode];

/// Topics the position control loop reads (control rate)
pub const POSITION_TOPICS: &[Topic] = &[Topic::Quaternion, Topic::FusedPosition];

/// Identifies one telemetry package allocated by the link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageHandle(pub u32);

impl fmt::Display for PackageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "package#{}", self.0)
    }
}

/// Actuation requests that return an acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ObtainAuthority,
    Takeoff,
    Land,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObtainAuthority => f.write_str("obtain control authority"),
            Self::Takeoff => f.write_str("takeoff"),
            Self::Land => f.write_str("land"),
        }
    }
}
