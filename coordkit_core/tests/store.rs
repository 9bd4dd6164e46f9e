use std::time::Duration;

use approx::assert_abs_diff_eq;
use coordkit_core::crs::{BuiltinRegistry, CrsCatalog};
use coordkit_core::{CoordError, Origin, RecordStore, SessionOutcome};
use coordkit_traits::ProjectionEngine;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

struct Offset;

impl ProjectionEngine for Offset {
    fn project(&self, _: &str, to: &str, x: f64, y: f64) -> Result<(f64, f64), BoxError> {
        if to.contains("+zone=50") {
            Ok((x + 1000.0, y + 2000.0))
        } else {
            Err("unsupported target".into())
        }
    }
}

fn err_kind(r: &eyre::Report) -> Option<&CoordError> {
    r.downcast_ref::<CoordError>()
}

#[test]
fn manual_records_get_numeric_names() {
    let mut s = RecordStore::new();
    let a = s.add_manual("7850", 1.0, 2.0, None, None).unwrap();
    let b = s.add_manual("7850", 3.0, 4.0, None, Some("  ")).unwrap();
    assert_eq!(a.name, "1");
    assert_eq!(b.name, "2");
    assert_eq!(b.notes, None);
    assert_eq!(a.origin, Origin::Manual);
    assert_ne!(a.id, b.id);
    assert_eq!(s.suggested_name(), "3");
}

#[test]
fn manual_override_is_made_unique() {
    let mut s = RecordStore::new();
    s.add_manual("4326", 0.0, 0.0, Some("Pole"), None).unwrap();
    let r = s.add_manual("4326", 0.0, 0.0, Some(" Pole "), None).unwrap();
    assert_eq!(r.name, "Pole_2");
}

#[test]
fn manual_rejects_non_finite() {
    let mut s = RecordStore::new();
    let err = s.add_manual("4326", f64::NAN, 0.0, None, None).unwrap_err();
    assert!(matches!(err_kind(&err), Some(CoordError::InvalidArgument(_))));
    assert!(s.is_empty());
}

#[test]
fn project_appends_derived_record() {
    let mut s = RecordStore::new();
    let src = s
        .add_manual("7850", 391159.523179, 6452622.726701, Some("Peg"), None)
        .unwrap();
    let p = s.project_record(&src.id, 45.0, 100.0).unwrap();
    assert_eq!(p.name, "Peg_Project");
    assert_eq!(p.crs_code, "7850");
    assert_eq!(p.origin, Origin::Projected);
    assert_abs_diff_eq!(p.x, 391230.233857, epsilon = 1e-6);
    assert_abs_diff_eq!(p.y, 6452693.437379, epsilon = 1e-6);
    assert_eq!(
        p.notes.as_deref(),
        Some("Projected from Peg: bearing 45.0°, distance 100.00 units")
    );
    let again = s.project_record(&src.id, 90.0, 1.0).unwrap();
    assert_eq!(again.name, "Peg_Project_2");
    assert_eq!(s.len(), 3);
}

#[test]
fn transform_appends_record_in_target_crs() {
    let mut s = RecordStore::new();
    let catalog = CrsCatalog::new(BuiltinRegistry);
    let src = s.add_manual("4326", 1.0, 2.0, Some("Gate"), None).unwrap();
    let t = s.transform_record(&src.id, "7850", &catalog, &Offset).unwrap();
    assert_eq!(t.name, "Gate_Transform");
    assert_eq!(t.crs_code, "7850");
    assert_eq!(t.origin, Origin::Transformed);
    assert_eq!((t.x, t.y), (1001.0, 2002.0));
}

#[test]
fn transform_failures_keep_store_unchanged() {
    let mut s = RecordStore::new();
    let catalog = CrsCatalog::new(BuiltinRegistry);
    let src = s.add_manual("4326", 1.0, 2.0, None, None).unwrap();

    let err = s.transform_record(&src.id, "3857", &catalog, &Offset).unwrap_err();
    assert!(matches!(err_kind(&err), Some(CoordError::TransformFailure(_))));

    let err = s.transform_record(&src.id, "nope", &catalog, &Offset).unwrap_err();
    assert!(matches!(err_kind(&err), Some(CoordError::UnknownCrs(c)) if c == "nope"));
    assert_eq!(s.len(), 1);
}

#[test]
fn find_bearing_appends_note_line() {
    let mut s = RecordStore::new();
    let a = s
        .add_manual("7850", 0.0, 0.0, Some("A"), Some("  existing  "))
        .unwrap();
    let b = s.add_manual("7850", 3.0, 4.0, Some("B"), None).unwrap();
    let bd = s.find_bearing(&a.id, &b.id).unwrap();
    assert_abs_diff_eq!(bd.distance, 5.0, epsilon = 1e-12);
    let notes = s.get(&a.id).unwrap().notes.clone().unwrap();
    assert_eq!(notes, "existing\nBearing to B: 36.9°, distance: 5.00 units");
}

#[test]
fn find_bearing_requires_same_crs() {
    let mut s = RecordStore::new();
    let a = s.add_manual("7850", 0.0, 0.0, None, None).unwrap();
    let b = s.add_manual("4326", 3.0, 4.0, None, None).unwrap();
    let err = s.find_bearing(&a.id, &b.id).unwrap_err();
    assert!(matches!(err_kind(&err), Some(CoordError::InvalidArgument(_))));
}

#[test]
fn rename_ignores_own_name_and_keeps_id() {
    let mut s = RecordStore::new();
    let a = s.add_manual("4326", 0.0, 0.0, Some("A"), None).unwrap();
    s.add_manual("4326", 0.0, 0.0, Some("B"), None).unwrap();
    assert_eq!(s.rename(&a.id, "A").unwrap(), "A");
    assert_eq!(s.rename(&a.id, "B").unwrap(), "B_2");
    assert_eq!(s.get(&a.id).unwrap().name, "B_2");
}

#[test]
fn notes_delete_and_reset() {
    let mut s = RecordStore::new();
    let a = s.add_manual("4326", 0.0, 0.0, None, None).unwrap();
    s.update_note(&a.id, Some("kerb")).unwrap();
    assert_eq!(s.get(&a.id).unwrap().notes.as_deref(), Some("kerb"));
    s.update_note(&a.id, Some("")).unwrap();
    assert_eq!(s.get(&a.id).unwrap().notes, None);

    let removed = s.delete(&a.id).unwrap();
    assert_eq!(removed.id, a.id);
    let err = s.delete(&a.id).unwrap_err();
    assert!(matches!(err_kind(&err), Some(CoordError::RecordNotFound(_))));

    s.add_manual("4326", 0.0, 0.0, None, None).unwrap();
    s.reset();
    assert!(s.is_empty());
}

#[test]
fn estimate_is_stored_as_lon_lat() {
    let mut s = RecordStore::new();
    let outcome = SessionOutcome {
        latitude: -30.25,
        longitude: 135.42,
        samples_used: 12,
        samples_discarded: 3,
        duration: Duration::from_secs(60),
    };
    let r = s.add_from_estimate("4326", &outcome, None).unwrap();
    assert_eq!((r.x, r.y), (135.42, -30.25));
    assert_eq!(r.name, "1");
    let notes = r.notes.unwrap();
    assert!(notes.contains("12 samples"));
    assert!(notes.contains("3 discarded"));
}
