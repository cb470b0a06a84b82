//! # Command Acknowledgements
//!
//! Classification of link acknowledgements plus the lookup that renders
//! them for operators.

use std::fmt;

/// Acknowledgement returned by the vehicle link for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Request accepted
    Success,
    /// No response within the request timeout
    Timeout,
    /// The application does not hold control authority
    NoAuthority,
    /// A request parameter was out of range
    InvalidParameter,
    /// Flight controller refused the request in its current state
    Rejected,
    /// Motors reported a fault
    MotorFailure,
    /// Code not known to this crate
    Unknown(u16),
}

impl Ack {
    /// Maps a raw link code to an acknowledgement.
    ///
    /// # Examples
    ///
    /// ```
    /// use uav_maneuvers::link::Ack;
    ///
    /// assert_eq!(Ack::from_code(0), Ack::Success);
    /// assert_eq!(Ack::from_code(999), Ack::Unknown(999));
    /// ```
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::Timeout,
            2 => Self::NoAuthority,
            3 => Self::InvalidParameter,
            4 => Self::Rejected,
            5 => Self::MotorFailure,
            other => Self::Unknown(other),
        }
    }

    /// Raw link code.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::Success => 0,
            Self::Timeout => 1,
            Self::NoAuthority => 2,
            Self::InvalidParameter => 3,
            Self::Rejected => 4,
            Self::MotorFailure => 5,
            Self::Unknown(code) => *code,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Human-readable description of the code.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "request accepted",
            Self::Timeout => "no acknowledgement before the request timed out",
            Self::NoAuthority => "control authority not obtained",
            Self::InvalidParameter => "request parameter out of range",
            Self::Rejected => "flight controller rejected the request in its current state",
            Self::MotorFailure => "motor fault reported",
            Self::Unknown(_) => "unrecognized acknowledgement code",
        }
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message(), self.code())
    }
}
