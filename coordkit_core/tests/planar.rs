use approx::assert_abs_diff_eq;
use coordkit_core::{CoordError, bearing_distance_between, project_from_bearing_distance};
use proptest::prelude::*;
use rstest::rstest;

fn circular_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

#[test]
fn projects_known_point() {
    let p = project_from_bearing_distance(391159.523179, 6452622.726701, 45.0, 100.0).unwrap();
    assert_abs_diff_eq!(p.easting, 391230.233857, epsilon = 1e-6);
    assert_abs_diff_eq!(p.northing, 6452693.437379, epsilon = 1e-6);
}

#[test]
fn zero_distance_returns_start() {
    let p = project_from_bearing_distance(10.0, 20.0, 123.0, 0.0).unwrap();
    assert_eq!((p.easting, p.northing), (10.0, 20.0));
    let bd = bearing_distance_between(10.0, 20.0, p.easting, p.northing).unwrap();
    assert_eq!(bd.distance, 0.0);
    assert_eq!(bd.bearing_deg, 0.0);
}

#[rstest]
#[case(f64::NAN, 0.0, 0.0, 1.0)]
#[case(0.0, f64::INFINITY, 0.0, 1.0)]
#[case(0.0, 0.0, f64::NEG_INFINITY, 1.0)]
#[case(0.0, 0.0, 0.0, f64::NAN)]
#[case(0.0, 0.0, 0.0, -0.5)]
fn project_rejects_bad_arguments(#[case] e: f64, #[case] n: f64, #[case] b: f64, #[case] d: f64) {
    let err = project_from_bearing_distance(e, n, b, d).unwrap_err();
    assert!(matches!(err, CoordError::InvalidArgument(_)), "{err:?}");
}

#[rstest]
#[case(f64::NAN, 0.0, 1.0, 1.0)]
#[case(0.0, f64::INFINITY, 1.0, 1.0)]
#[case(0.0, 0.0, f64::NEG_INFINITY, 1.0)]
#[case(0.0, 0.0, 1.0, f64::NAN)]
fn bearing_rejects_non_finite(#[case] a: f64, #[case] b: f64, #[case] c: f64, #[case] d: f64) {
    let err = bearing_distance_between(a, b, c, d).unwrap_err();
    assert!(matches!(err, CoordError::InvalidArgument(_)));
}

#[rstest]
#[case(0.0, 1.0, 0.0)]
#[case(1.0, 1.0, 45.0)]
#[case(1.0, 0.0, 90.0)]
#[case(0.0, -1.0, 180.0)]
#[case(-1.0, -1.0, 225.0)]
#[case(-1.0, 1.0, 315.0)]
fn compass_bearings(#[case] de: f64, #[case] dn: f64, #[case] expected: f64) {
    let bd = bearing_distance_between(100.0, 200.0, 100.0 + de, 200.0 + dn).unwrap();
    assert_abs_diff_eq!(bd.bearing_deg, expected, epsilon = 1e-9);
}

proptest! {
    #[test]
    fn inverse_recovers_bearing_and_distance(
        e in -1.0e6f64..1.0e6,
        n in -1.0e7f64..1.0e7,
        b in -720.0f64..720.0,
        d in 1.0f64..1.0e5,
    ) {
        let p = project_from_bearing_distance(e, n, b, d).unwrap();
        let bd = bearing_distance_between(e, n, p.easting, p.northing).unwrap();
        prop_assert!((bd.distance - d).abs() < 1e-6, "distance {} vs {}", bd.distance, d);
        prop_assert!(circular_diff(bd.bearing_deg, b.rem_euclid(360.0)) < 1e-6);
        prop_assert!((0.0..360.0).contains(&bd.bearing_deg));
    }

    #[test]
    fn bearing_always_in_range(
        a in -1.0e6f64..1.0e6, b in -1.0e6f64..1.0e6,
        c in -1.0e6f64..1.0e6, d in -1.0e6f64..1.0e6,
    ) {
        let bd = bearing_distance_between(a, b, c, d).unwrap();
        prop_assert!((0.0..360.0).contains(&bd.bearing_deg));
        prop_assert!(bd.distance >= 0.0);
    }
}
