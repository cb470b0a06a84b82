//! # Geodetic Offsets
//!
//! Flat-earth conversion between fused GPS positions and a local
//! tangent-plane frame anchored at an origin sample.
//!
//! ## Frame Convention
//!
//! | Axis | Direction | Source |
//! |------|-----------|--------|
//! | x | North | latitude delta |
//! | y | East | longitude delta, scaled by `cos(lat)` |
//! | z | Up | altitude delta |
//!
//! The approximation is only valid for small displacements (a few hundred
//! meters). Callers bound the displacement, so there is no error path here.

/// Equatorial earth radius used by the flat-earth approximation (WGS-84, meters)
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Fused geodetic position as reported by telemetry
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeodeticPosition {
    /// Latitude in radians
    pub latitude: f64,
    /// Longitude in radians
    pub longitude: f64,
    /// Altitude in meters (up positive)
    pub altitude: f64,
}

impl GeodeticPosition {
    /// Creates a position from radians and meters.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    /// Returns the position displaced by a local offset from `self`.
    ///
    /// Inverse of [`local_offset`] for small offsets. Used by the simulated
    /// vehicle to publish fused positions.
    ///
    /// # Examples
    ///
    /// ```
    /// use uav_maneuvers::transform::{local_offset, GeodeticPosition, LocalOffset};
    ///
    /// let origin = GeodeticPosition::new(0.39, 1.98, 10.0);
    /// let moved = origin.displaced(&LocalOffset::new(3.0, -4.0, 2.0));
    /// let back = local_offset(&moved, &origin);
    ///
    /// assert!((back.x - 3.0).abs() < 1e-6);
    /// assert!((back.y + 4.0).abs() < 1e-3);
    /// assert!((back.z - 2.0).abs() < 1e-9);
    /// ```
    #[must_use]
    pub fn displaced(&self, offset: &LocalOffset) -> Self {
        let latitude = self.latitude + offset.x / EARTH_RADIUS_M;
        let longitude = self.longitude + offset.y / (EARTH_RADIUS_M * latitude.cos());
        Self {
            latitude,
            longitude,
            altitude: self.altitude + offset.z,
        }
    }
}

/// Offset in the local tangent-plane frame, in meters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocalOffset {
    /// North
    pub x: f64,
    /// East
    pub y: f64,
    /// Up
    pub z: f64,
}

impl LocalOffset {
    /// Creates an offset from its three components.
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Local offset of `current` relative to `origin`
///
/// # Arguments
///
/// * `current` - Latest fused position
/// * `origin` - Position captured at maneuver start
///
/// # Returns
///
/// North/east/up offset in meters. The east scale uses the current latitude.
///
/// # Examples
///
/// ```
/// use uav_maneuvers::transform::{local_offset, GeodeticPosition};
///
/// let origin = GeodeticPosition::new(0.5, 0.2, 100.0);
/// let offset = local_offset(&origin, &origin);
/// assert_eq!(offset.x, 0.0);
/// assert_eq!(offset.y, 0.0);
/// assert_eq!(offset.z, 0.0);
/// ```
#[must_use]
pub fn local_offset(current: &GeodeticPosition, origin: &GeodeticPosition) -> LocalOffset {
    let delta_lat = current.latitude - origin.latitude;
    let delta_lon = current.longitude - origin.longitude;

    LocalOffset {
        x: delta_lat * EARTH_RADIUS_M,
        y: delta_lon * EARTH_RADIUS_M * current.latitude.cos(),
        z: current.altitude - origin.altitude,
    }
}
