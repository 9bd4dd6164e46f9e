use std::fs::File;
use std::io::Write;

use coordkit_config::{FixtureRow, load_fixture_csv};
use rstest::rstest;
use tempfile::tempdir;

fn write(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fixes.csv");
    let mut f = File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    (dir, path)
}

#[rstest]
fn loads_rows_in_order() {
    let (_d, p) = write(
        "latitude,longitude,accuracy\n-30.2555590864031,135.421626482112,4\n-30.2555602864031, 135.421627482112 ,15.5\n",
    );
    let rows = load_fixture_csv(&p).unwrap();
    assert_eq!(
        rows,
        vec![
            FixtureRow {
                latitude: -30.2555590864031,
                longitude: 135.421626482112,
                accuracy: 4.0
            },
            FixtureRow {
                latitude: -30.2555602864031,
                longitude: 135.421627482112,
                accuracy: 15.5
            },
        ]
    );
}

#[rstest]
#[case("lat,lon,accuracy\n1,2,3\n", "must have headers")]
#[case("latitude,longitude,accuracy\n1,x,3\n", "invalid CSV row 2")]
#[case("latitude,longitude,accuracy\n1,inf,3\n", "non-finite coordinate")]
#[case("latitude,longitude,accuracy\n1,2,-3\n", "invalid accuracy")]
#[case("latitude,longitude,accuracy\n", "contains no rows")]
fn rejects_bad_files(#[case] contents: &str, #[case] msg: &str) {
    let (_d, p) = write(contents);
    let err = load_fixture_csv(&p).unwrap_err();
    assert!(format!("{err}").contains(msg), "got: {err}");
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = load_fixture_csv(&dir.path().join("nope.csv")).unwrap_err();
    assert!(format!("{err}").contains("open fixture CSV"));
}
