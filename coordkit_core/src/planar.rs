//! Planar bearing/distance kernel.
//!
//! Works on easting/northing pairs with a flat-earth model: bearings are
//! degrees clockwise from grid north, distances are in the CRS's units.

use crate::error::CoordError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanarPoint {
    pub easting: f64,
    pub northing: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BearingDistance {
    /// Degrees in [0, 360).
    pub bearing_deg: f64,
    pub distance: f64,
}

/// Move `distance` units from `(easting, northing)` along `bearing_deg`.
///
/// 0° is pure +northing, 90° is pure +easting. Any finite bearing is
/// accepted since the formula is periodic.
pub fn project_from_bearing_distance(
    easting: f64,
    northing: f64,
    bearing_deg: f64,
    distance: f64,
) -> Result<PlanarPoint, CoordError> {
    if ![easting, northing, bearing_deg, distance]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(CoordError::InvalidArgument(
            "All arguments must be finite numbers.".into(),
        ));
    }
    if distance < 0.0 {
        return Err(CoordError::InvalidArgument(
            "Distance must be non-negative.".into(),
        ));
    }
    let rad = bearing_deg.to_radians();
    Ok(PlanarPoint {
        easting: distance.mul_add(rad.sin(), easting),
        northing: distance.mul_add(rad.cos(), northing),
    })
}

/// Inverse of [`project_from_bearing_distance`].
///
/// Coincident points give distance 0 and bearing 0 (`atan2(0, 0)`).
pub fn bearing_distance_between(
    from_easting: f64,
    from_northing: f64,
    to_easting: f64,
    to_northing: f64,
) -> Result<BearingDistance, CoordError> {
    if ![from_easting, from_northing, to_easting, to_northing]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(CoordError::InvalidArgument(
            "All arguments must be finite numbers.".into(),
        ));
    }
    let de = to_easting - from_easting;
    let dn = to_northing - from_northing;
    let distance = de.hypot(dn);
    let mut bearing_deg = de.atan2(dn).to_degrees();
    if bearing_deg < 0.0 {
        bearing_deg += 360.0;
    }
    // -tiny + 360.0 rounds to exactly 360.0
    if bearing_deg >= 360.0 {
        bearing_deg -= 360.0;
    }
    Ok(BearingDistance {
        bearing_deg,
        distance,
    })
}
