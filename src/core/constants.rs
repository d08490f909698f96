//! Physical constants and system limits

/// Mean equatorial Earth radius used for degree/meter conversions (km)
pub const EARTH_RADIUS_KM: f64 = 6378.137;

/// One meter expressed in degrees of latitude at the equator
pub const METERS_TO_DEGREES: f64 =
    1.0 / (2.0 * std::f64::consts::PI / 360.0 * EARTH_RADIUS_KM) / 1000.0;

/// Minimum accepted cloud-anchor time-to-live (seconds)
pub const MIN_HOST_TTL_SECONDS: u32 = 1;

/// Maximum time-to-live accepted by the hosting service (seconds)
pub const MAX_HOST_TTL_SECONDS: u32 = 365;

/// Time-to-live applied to hosted anchors when none is configured (seconds)
pub const DEFAULT_HOST_TTL_SECONDS: u32 = 300;
