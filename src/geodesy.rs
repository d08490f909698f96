//! Camera-relative to geodetic coordinate math
//!
//! Pure functions that turn the displacement between the camera pose and a
//! local anchor pose into an estimated latitude/longitude offset from the
//! camera's geodetic pose. The estimate is diagnostic: authoritative
//! placement goes through the engine's own pose conversion, while this
//! module's output is computed alongside it for logging and fallback use.

use crate::core::constants::METERS_TO_DEGREES;
use crate::core::types::{GeospatialPose, Pose};
use std::fmt;

/// Latitude/longitude pair produced by the offset estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Errors from geodetic estimation
#[derive(Debug, Clone, PartialEq)]
pub enum GeodesyError {
    /// Longitude scaling degenerates at the poles (cos(latitude) == 0)
    PolarLatitude { latitude: f64 },
}

impl fmt::Display for GeodesyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeodesyError::PolarLatitude { latitude } => {
                write!(f, "longitude offset undefined at latitude {}", latitude)
            }
        }
    }
}

impl std::error::Error for GeodesyError {}

/// Straight-line 3D distance between the camera and an anchor, in meters
///
/// Euclidean norm of the position difference; does not account for earth
/// curvature, so it is only valid for anchors within tens of meters of the
/// camera.
pub fn distance(camera_pose: &Pose, anchor_pose: &Pose) -> f32 {
    (anchor_pose.position - camera_pose.position).norm()
}

/// Estimate the anchor's latitude/longitude from the camera's geodetic pose
///
/// The camera/anchor distance is converted to degrees and applied as a pure
/// north offset: the bearing of the anchor relative to the camera is not
/// taken into account. Longitude is scaled by `cos(latitude)`, which is
/// undefined at the poles; latitudes of +/-90 degrees return
/// [`GeodesyError::PolarLatitude`] instead of a non-finite coordinate.
pub fn estimate_geodetic_offset(
    geospatial_pose: &GeospatialPose,
    camera_pose: &Pose,
    anchor_pose: &Pose,
) -> Result<GeoPoint, GeodesyError> {
    let cos_latitude = geospatial_pose.latitude.to_radians().cos();
    if cos_latitude.abs() < 1e-9 {
        return Err(GeodesyError::PolarLatitude {
            latitude: geospatial_pose.latitude,
        });
    }

    let offset_degrees = distance(camera_pose, anchor_pose) as f64 * METERS_TO_DEGREES;

    Ok(GeoPoint {
        latitude: geospatial_pose.latitude + offset_degrees,
        longitude: geospatial_pose.longitude + offset_degrees / cos_latitude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_zero_for_coincident_poses() {
        let pose = Pose::from_translation(1.5, -2.0, 0.25);
        assert_eq!(distance(&pose, &pose), 0.0);
    }

    #[test]
    fn test_distance_pythagorean_triple() {
        let camera = Pose::from_translation(0.0, 0.0, 0.0);
        let anchor = Pose::from_translation(3.0, 4.0, 0.0);
        assert_eq!(distance(&camera, &anchor), 5.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Pose::from_translation(1.0, 2.0, 3.0);
        let b = Pose::from_translation(-2.0, 0.5, 7.0);
        assert_eq!(distance(&a, &b), distance(&b, &a));
    }

    #[test]
    fn test_offset_identity_at_zero_distance() {
        let pose = Pose::from_translation(2.0, 0.0, -1.0);

        for (latitude, longitude) in [(45.0, -122.0), (0.0, 0.0)] {
            let geo = GeospatialPose::new(latitude, longitude, 30.0);
            let point = estimate_geodetic_offset(&geo, &pose, &pose).unwrap();
            assert_eq!(point.latitude, latitude);
            assert_eq!(point.longitude, longitude);
        }
    }

    #[test]
    fn test_offset_at_equator() {
        let geo = GeospatialPose::new(0.0, 10.0, 0.0);
        let camera = Pose::identity();
        let anchor = Pose::from_translation(0.0, 0.0, -100.0);

        let point = estimate_geodetic_offset(&geo, &camera, &anchor).unwrap();

        // 100 m is roughly 0.0009 degrees, and cos(0) leaves longitude with
        // the same offset as latitude.
        let expected = 100.0 * METERS_TO_DEGREES;
        assert!((point.latitude - expected).abs() < 1e-12);
        assert!((point.longitude - (10.0 + expected)).abs() < 1e-12);
    }

    #[test]
    fn test_offset_projects_north_only() {
        let geo = GeospatialPose::new(40.0, -3.0, 650.0);
        let camera = Pose::identity();
        let east = Pose::from_translation(10.0, 0.0, 0.0);
        let west = Pose::from_translation(-10.0, 0.0, 0.0);

        // Anchors at the same range but opposite bearings produce the same
        // estimate; only the distance enters the formula.
        let a = estimate_geodetic_offset(&geo, &camera, &east).unwrap();
        let b = estimate_geodetic_offset(&geo, &camera, &west).unwrap();
        assert_eq!(a, b);
        assert!(a.latitude > geo.latitude);
    }

    #[test]
    fn test_offset_fails_at_poles() {
        let camera = Pose::identity();
        let anchor = Pose::from_translation(1.0, 0.0, 0.0);

        for latitude in [90.0, -90.0] {
            let geo = GeospatialPose::new(latitude, 0.0, 0.0);
            let result = estimate_geodetic_offset(&geo, &camera, &anchor);
            assert_eq!(result, Err(GeodesyError::PolarLatitude { latitude }));
        }
    }
}
