use std::fs::File;
use std::io::Write;

use rstest::rstest;
use tempfile::tempdir;
use tracker_config::{TraceRow, load_light_trace_csv};

fn write_csv(lines: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.csv");
    let mut f = File::create(&path).unwrap();
    for line in lines {
        writeln!(f, "{line}").unwrap();
    }
    (dir, path)
}

#[rstest]
fn loads_rows_in_order() {
    let (_dir, path) = write_csv(&[
        "t_ms,h_a,h_b,v_a,v_b",
        "0,512,498,700,690",
        "25,515,497,702,688",
        "25,516,496,703,687",
    ]);
    let rows = load_light_trace_csv(&path).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[0],
        TraceRow {
            t_ms: 0,
            h_a: 512,
            h_b: 498,
            v_a: 700,
            v_b: 690
        }
    );
    assert_eq!(rows[2].t_ms, 25);
}

#[rstest]
#[case("t,h_a,h_b,v_a,v_b")]
#[case("t_ms,h_a,h_b")]
#[case("t_ms,h_b,h_a,v_a,v_b")]
fn csv_with_wrong_headers_errors(#[case] header: &str) {
    let (_dir, path) = write_csv(&[header, "0,1,2,3,4"]);
    let err = load_light_trace_csv(&path).expect_err("should error on bad headers");
    assert!(format!("{err}").contains("headers 't_ms,h_a,h_b,v_a,v_b'"));
}

#[rstest]
fn csv_with_non_numeric_errors() {
    let (_dir, path) = write_csv(&["t_ms,h_a,h_b,v_a,v_b", "0,bright,dim,1,1"]);
    let err = load_light_trace_csv(&path).expect_err("should error on non-numeric");
    assert!(format!("{err}").contains("invalid CSV row 2"));
}

#[rstest]
fn csv_going_back_in_time_errors() {
    let (_dir, path) = write_csv(&["t_ms,h_a,h_b,v_a,v_b", "50,1,1,1,1", "40,1,1,1,1"]);
    let err = load_light_trace_csv(&path).expect_err("should reject decreasing t_ms");
    assert!(format!("{err}").contains("non-decreasing"));
}

#[rstest]
fn csv_without_rows_errors() {
    let (_dir, path) = write_csv(&["t_ms,h_a,h_b,v_a,v_b"]);
    let err = load_light_trace_csv(&path).expect_err("should reject empty trace");
    assert!(format!("{err}").contains("no rows"));
}

#[rstest]
fn missing_file_errors() {
    let dir = tempdir().unwrap();
    let err = load_light_trace_csv(&dir.path().join("nope.csv")).expect_err("missing file");
    assert!(format!("{err}").contains("open light trace CSV"));
}
