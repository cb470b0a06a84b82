//! # Orientation Conversions
//!
//! Quaternion to Euler conversion (roll, pitch, yaw in radians, ZYX order)
//! on top of `nalgebra`.
//!
//! Telemetry quaternions are normalized through [`UnitQuaternion`] before
//! conversion, so floating-point overshoot near ±90° pitch never produces
//! NaN and pitch stays within `[-π/2, π/2]`.

use nalgebra::UnitQuaternion;
use std::f64::consts::PI;

/// Attitude quaternion as reported by telemetry (`w` is the scalar part)
pub type Quaternion = nalgebra::Quaternion<f64>;

/// Level attitude with the given heading (radians).
///
/// # Examples
///
/// ```
/// use uav_maneuvers::transform::{euler_from_quaternion, quaternion_from_yaw};
///
/// let q = quaternion_from_yaw(0.5);
/// assert!((euler_from_quaternion(&q).yaw - 0.5).abs() < 1e-12);
/// ```
#[must_use]
pub fn quaternion_from_yaw(yaw: f64) -> Quaternion {
    UnitQuaternion::from_euler_angles(0.0, 0.0, yaw).into_inner()
}

/// Roll, pitch and yaw in radians
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// Converts an attitude quaternion to Euler angles
///
/// # Arguments
///
/// * `q` - Attitude quaternion; renormalized before conversion
///
/// # Returns
///
/// Roll and yaw in `[-π, π]`, pitch in `[-π/2, π/2]`. Never NaN for a
/// non-zero quaternion.
///
/// # Examples
///
/// ```
/// use uav_maneuvers::transform::{euler_from_quaternion, Quaternion};
///
/// let angles = euler_from_quaternion(&Quaternion::identity());
/// assert_eq!(angles.roll, 0.0);
/// assert_eq!(angles.pitch, 0.0);
/// assert_eq!(angles.yaw, 0.0);
/// ```
#[must_use]
pub fn euler_from_quaternion(q: &Quaternion) -> EulerAngles {
    let (roll, pitch, yaw) = UnitQuaternion::from_quaternion(*q).euler_angles();
    EulerAngles { roll, pitch, yaw }
}

/// Wraps an angle to `(-π, π]`.
///
/// # Examples
///
/// ```
/// use uav_maneuvers::transform::wrap_angle;
///
/// let wrapped = wrap_angle(3.0 * std::f64::consts::PI / 2.0);
/// assert!((wrapped + std::f64::consts::FRAC_PI_2).abs() < 1e-12);
/// ```
#[must_use]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}
