//! # Error Types
//!
//! Maneuver outcomes and crate errors using `thiserror`.
//!
//! Every terminal failure of a maneuver is a distinct [`ManeuverError`]
//! variant so operators can react to each one differently. Display text
//! comes from `thiserror`; operator guidance is a separate lookup in
//! [`ManeuverError::hint`].

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::link::{Ack, Command, DisplayMode};

/// Step of the subscription setup that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStage {
    /// Package could not be allocated
    Init,
    /// Package was allocated but would not start
    Start,
}

impl fmt::Display for SubscriptionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("init"),
            Self::Start => f.write_str("start"),
        }
    }
}

/// Terminal failure of a takeoff, landing or offset move
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManeuverError {
    /// Telemetry capability did not verify
    #[error("telemetry link not ready: {0}")]
    LinkNotReady(Ack),

    /// Telemetry package could not be set up
    #[error("telemetry subscription failed at {stage}: {ack}")]
    SubscriptionFailed { stage: SubscriptionStage, ack: Ack },

    /// Command channel refused a takeoff or landing request
    #[error("{command} request rejected: {ack}")]
    ActuationRejected { command: Command, ack: Ack },

    /// Motors did not report active within the motor start budget
    #[error("takeoff failed: motors are not spinning")]
    MotorsNotStarted,

    /// Motors spin but the vehicle never became airborne
    #[error("takeoff failed: aircraft is still on the ground with motors spinning")]
    StillOnGround,

    /// Controller never entered auto-landing
    #[error("landing failed: aircraft is still in the air")]
    LandingNotStarted,

    /// A confirmation phase ran out of cycles with the maneuver still in progress
    #[error("{phase} not confirmed within {cycles} cycles; maneuver still in progress")]
    PhaseTimeout { phase: &'static str, cycles: u32 },

    /// Maneuver finished physically but the controller is not in a stable hold mode
    #[error("maneuver finished, but the aircraft is in an unexpected mode ({0})")]
    UnexpectedMode(DisplayMode),

    /// Position control did not converge before its ceiling
    #[error("position control timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
}

/// Outcome type of [`crate::maneuver::Maneuvers::takeoff`]
pub type TakeoffError = ManeuverError;

/// Outcome type of [`crate::maneuver::Maneuvers::landing`]
pub type LandingError = ManeuverError;

/// Outcome type of [`crate::maneuver::Maneuvers::move_to_offset`]
pub type MoveError = ManeuverError;

impl ManeuverError {
    /// Operator guidance for the failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use uav_maneuvers::error::ManeuverError;
    ///
    /// assert!(ManeuverError::StillOnGround.hint().contains("ground sensor"));
    /// ```
    #[must_use]
    pub fn hint(&self) -> &'static str {
        match self {
            Self::LinkNotReady(_) => "check the vehicle link connection and activation",
            Self::SubscriptionFailed { .. } => {
                "telemetry packages may be left over; restart the flight controller to get back to a clean state"
            }
            Self::ActuationRejected { .. } => "check control authority and arming preconditions",
            Self::MotorsNotStarted => "check ESCs, arming switches and motor health",
            Self::StillOnGround => "possible ground sensor fault or insufficient thrust",
            Self::LandingNotStarted => "vehicle ignored the landing request; take manual control",
            Self::PhaseTimeout { .. } => "aircraft may still be flying; watch it and be ready to take manual control",
            Self::UnexpectedMode(_) => "connect the ground station app and inspect the flight mode",
            Self::Timeout { .. } => "position not held; possible wind disturbance or poor GPS",
        }
    }
}

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes_are_distinguishable() {
        let outcomes = [
            ManeuverError::MotorsNotStarted,
            ManeuverError::StillOnGround,
            ManeuverError::LandingNotStarted,
            ManeuverError::UnexpectedMode(DisplayMode::Manual),
            ManeuverError::PhaseTimeout {
                phase: "touchdown",
                cycles: 60,
            },
            ManeuverError::Timeout {
                elapsed: Duration::from_secs(10),
            },
        ];

        for (i, a) in outcomes.iter().enumerate() {
            for b in outcomes.iter().skip(i + 1) {
                assert_ne!(a, b);
                assert_ne!(a.to_string(), b.to_string());
            }
        }
    }

    #[test]
    fn test_rejection_message_names_command_and_code() {
        let err = ManeuverError::ActuationRejected {
            command: Command::Takeoff,
            ack: Ack::NoAuthority,
        };
        let text = err.to_string();
        assert!(text.starts_with("takeoff request rejected"));
        assert!(text.contains("code 2"));
    }

    #[test]
    fn test_subscription_failure_names_stage() {
        let err = ManeuverError::SubscriptionFailed {
            stage: SubscriptionStage::Start,
            ack: Ack::Timeout,
        };
        assert!(err.to_string().contains("at start"));
    }

    #[test]
    fn test_hints_are_not_empty() {
        assert!(!ManeuverError::Timeout { elapsed: Duration::ZERO }.hint().is_empty());
        assert!(!ManeuverError::LinkNotReady(Ack::Timeout).hint().is_empty());
        assert!(ManeuverError::PhaseTimeout { phase: "touchdown", cycles: 60 }
            .hint()
            .contains("still be flying"));
    }
}
