//
// Copyright (c) 2026 Axel Kenzo contributors
// This source code is subject to the terms of the MIT license.
// If a copy of the license was not distributed with this file, you can obtain one at https://opensource.org/licenses/MIT.
//
// Project: aktool-icode -- file and process integrity verification engine.
//

use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Sample files live under `<tempdir>/data`, kept separate from the
/// database file so evaluate/verify never walk over the database itself.
fn write_sample_tree(tempdir: &TempDir) -> PathBuf {
    let data = tempdir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("a.txt"), b"alpha contents").unwrap();
    fs::write(data.join("b.txt"), b"bravo contents").unwrap();
    data
}

fn evaluate(db: &Path, data: &Path) -> assert_cmd::assert::Assert {
    Command::cargo_bin("aktool-icode")
        .unwrap()
        .args(["--evaluate", "--database", db.to_str().unwrap(), data.to_str().unwrap()])
        .assert()
}

fn verify(db: &Path, data: &Path) -> assert_cmd::assert::Assert {
    Command::cargo_bin("aktool-icode")
        .unwrap()
        .args(["--verify", "--database", db.to_str().unwrap(), data.to_str().unwrap()])
        .assert()
}

#[test]
fn acceptance_evaluate_then_verify_is_clean() {
    let tempdir = TempDir::new().unwrap();
    let data = write_sample_tree(&tempdir);
    let db = tempdir.path().join("icode.db");

    evaluate(&db, &data).success();
    verify(&db, &data).success();
}

#[test]
fn acceptance_changed_file_fails_verify() {
    let tempdir = TempDir::new().unwrap();
    let data = write_sample_tree(&tempdir);
    let db = tempdir.path().join("icode.db");

    evaluate(&db, &data).success();
    fs::write(data.join("a.txt"), b"tampered contents").unwrap();

    verify(&db, &data).failure().code(10);
}

#[test]
fn acceptance_deleted_file_reported_and_fails_verify() {
    let tempdir = TempDir::new().unwrap();
    let data = write_sample_tree(&tempdir);
    let db = tempdir.path().join("icode.db");

    evaluate(&db, &data).success();
    fs::remove_file(data.join("a.txt")).unwrap();

    verify(&db, &data).failure().code(11).stdout(contains("deleted:"));
}

#[test]
fn acceptance_list_reports_stored_entries() {
    let tempdir = TempDir::new().unwrap();
    let data = write_sample_tree(&tempdir);
    let db = tempdir.path().join("icode.db");

    evaluate(&db, &data).success();

    Command::cargo_bin("aktool-icode")
        .unwrap()
        .args(["--list", "--database", db.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("a.txt"))
        .stdout(contains("b.txt"));
}

#[test]
fn acceptance_clean_removes_the_database_file() {
    let tempdir = TempDir::new().unwrap();
    let data = write_sample_tree(&tempdir);
    let db = tempdir.path().join("icode.db");

    evaluate(&db, &data).success();
    assert!(db.exists());

    Command::cargo_bin("aktool-icode")
        .unwrap()
        .args(["--clean", "--database", db.to_str().unwrap()])
        .assert()
        .success();

    assert!(!db.exists());
}

#[test]
fn acceptance_exclude_file_keeps_entry_out_of_database() {
    let tempdir = TempDir::new().unwrap();
    let data = write_sample_tree(&tempdir);
    let db = tempdir.path().join("icode.db");
    let excluded = data.join("a.txt").to_str().unwrap().to_string();

    Command::cargo_bin("aktool-icode")
        .unwrap()
        .args([
            "--evaluate",
            "--database",
            db.to_str().unwrap(),
            "--exclude-file",
            &excluded,
            data.to_str().unwrap(),
        ])
        .assert()
        .success();

    Command::cargo_bin("aktool-icode")
        .unwrap()
        .args(["--list", "--database", db.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("b.txt"))
        .stdout(contains("a.txt").not());
}
