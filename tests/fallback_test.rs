use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let mut script = tempfile::NamedTempFile::new().unwrap();
    writeln!(script, r#"{{"op":"create_admin","username":"staff"}}"#).unwrap();

    let mut cmd = Command::new(cargo_bin!("racedesk"));
    cmd.arg("replay")
        .arg(script.path())
        .arg("--db-path")
        .arg("some_db");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("storage-rocksdb"))
        .stdout(predicate::str::contains(r#""username":"staff""#));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let mut script = tempfile::NamedTempFile::new().unwrap();
    writeln!(script, r#"{{"op":"create_admin","username":"staff"}}"#).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut cmd = Command::new(cargo_bin!("racedesk"));
    cmd.arg("replay")
        .arg(script.path())
        .arg("--db-path")
        .arg(&db_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("storage-rocksdb").not());
}
