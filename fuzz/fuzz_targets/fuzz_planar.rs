#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (f64, f64, f64, f64)| {
    let (e, n, b, d) = input;
    if let Ok(p) = coordkit_core::project_from_bearing_distance(e, n, b, d) {
        if let Ok(bd) = coordkit_core::bearing_distance_between(e, n, p.easting, p.northing) {
            assert!(bd.distance.is_nan() || bd.distance >= 0.0);
            assert!(bd.bearing_deg.is_nan() || (0.0..360.0).contains(&bd.bearing_deg));
        }
    }
});
