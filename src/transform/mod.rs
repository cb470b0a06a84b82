//! # Coordinate and Orientation Transforms
//!
//! Pure conversions that turn raw telemetry into control-loop quantities.
//!
//! This module handles:
//! - Geodetic (radians, meters) to local tangent-plane offsets
//! - Unit quaternion to Euler roll/pitch/yaw
//! - Angle helpers shared by the control loop

pub mod geodetic;
pub mod orientation;

pub use geodetic::{local_offset, GeodeticPosition, LocalOffset, EARTH_RADIUS_M};
pub use orientation::{euler_from_quaternion, quaternion_from_yaw, wrap_angle, EulerAngles, Quaternion};
