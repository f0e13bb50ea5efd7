//! End-to-end runs of the CLI binary over fixture files copied into a
//! temporary folder.

mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::fixtures::{copy_fixture, read_clean_csv};
use predicates::prelude::*;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn talcleaner() -> assert_cmd::Command {
    cargo_bin_cmd!("talcleaner")
}

// ─────────────────────────────────────────────────────────────────────────────
// Single file
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_single_file_written_alongside() {
    let tmp = TempDir::new().expect("create temp dir");
    copy_fixture("accounts.csv", tmp.path());

    talcleaner()
        .current_dir(tmp.path())
        .arg("accounts.csv")
        .timeout(Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleaning completed!"))
        .stdout(predicate::str::contains("Tables cleaned: 1"));

    assert_eq!(
        read_clean_csv(&tmp.path().join("accounts_clean_name.csv")),
        vec!["Acme", "Globex", "Initech"]
    );
    assert!(!tmp.path().join("clean_companies").exists());
    assert!(!tmp.path().join("tal_info.xlsx").exists());
}

#[test]
fn test_single_file_into_subfolder_with_report() {
    let tmp = TempDir::new().expect("create temp dir");
    let input = copy_fixture("domains.csv", tmp.path());

    talcleaner()
        .arg("--subfolder")
        .arg("--report")
        .arg(&input)
        .timeout(Duration::from_secs(30))
        .assert()
        .success();

    let out = tmp.path().join("clean_companies");
    assert_eq!(
        read_clean_csv(&out.join("domains_clean_domain.csv")),
        vec!["acme.com", "globex.co.uk", "initech.io"]
    );
    assert!(out.join("tal_info.xlsx").exists());
}

#[test]
fn test_unsupported_file_type_fails() {
    let tmp = TempDir::new().expect("create temp dir");
    fs::write(tmp.path().join("notes.txt"), "Acme Inc\n").unwrap();

    talcleaner()
        .current_dir(tmp.path())
        .arg("notes.txt")
        .timeout(Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file type"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Folder mode
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_folder_mode_cleans_every_file() {
    let tmp = TempDir::new().expect("create temp dir");
    let input = tmp.path().join("lists");
    fs::create_dir(&input).unwrap();
    copy_fixture("accounts.csv", &input);
    copy_fixture("dual.csv", &input);
    fs::write(input.join("~$accounts.xlsx"), b"lock").unwrap();
    fs::write(input.join("broken.xlsx"), b"not a zip").unwrap();

    talcleaner()
        .arg("--report")
        .arg(&input)
        .timeout(Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("Files processed: 3"))
        .stdout(predicate::str::contains("Tables skipped: 1"))
        .stdout(predicate::str::contains("broken.xlsx skipped"));

    let out = input.join("clean_companies");
    assert_eq!(
        read_clean_csv(&out.join("dual_clean_name.csv")),
        vec!["Acme", "Globex", "Initech", "Hooli"]
    );
    assert!(out.join("accounts_clean_name.csv").exists());
    assert!(out.join("tal_info.xlsx").exists());
}

#[test]
fn test_folder_mode_alongside() {
    let tmp = TempDir::new().expect("create temp dir");
    copy_fixture("accounts.csv", tmp.path());

    talcleaner()
        .arg("--alongside")
        .arg(tmp.path())
        .timeout(Duration::from_secs(30))
        .assert()
        .success();

    assert!(tmp.path().join("accounts_clean_name.csv").exists());
    assert!(!tmp.path().join("clean_companies").exists());

    // Outputs from the first run are not cleaned again
    talcleaner()
        .arg("--alongside")
        .arg(tmp.path())
        .timeout(Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("Files processed: 1"));
    assert!(!tmp.path().join("accounts_clean_name_clean_name.csv").exists());
}

#[test]
fn test_workbook_sheets_become_separate_outputs() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("book.xlsx");

    let mut workbook = rust_xlsxwriter::Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Accounts").unwrap();
        sheet.write_string(0, 0, "Company Name").unwrap();
        sheet.write_string(1, 0, "Acme Inc").unwrap();
        sheet.write_string(2, 0, "Globex Corp").unwrap();
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Web Sites").unwrap();
        sheet.write_string(0, 0, "Website").unwrap();
        sheet.write_string(1, 0, "https://acme.com").unwrap();
        sheet.write_string(2, 0, "www.globex.com").unwrap();
    }
    workbook.save(&path).unwrap();

    talcleaner()
        .arg(&path)
        .timeout(Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("Tables cleaned: 2"));

    assert_eq!(
        read_clean_csv(&tmp.path().join("book_Accounts_clean_name.csv")),
        vec!["Acme", "Globex"]
    );
    assert_eq!(
        read_clean_csv(&tmp.path().join("book_Web_Sites_clean_domain.csv")),
        vec!["acme.com", "globex.com"]
    );
}

#[test]
fn test_empty_folder_fails() {
    let tmp = TempDir::new().expect("create temp dir");

    talcleaner()
        .arg(tmp.path())
        .timeout(Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No CSV or Excel files found"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_log_file_export() {
    let tmp = TempDir::new().expect("create temp dir");
    copy_fixture("accounts.csv", tmp.path());

    talcleaner()
        .current_dir(tmp.path())
        .args(["-v", "--log-file", "logs/run.log", "accounts.csv"])
        .timeout(Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("Logs exported to"));

    let log = fs::read_to_string(tmp.path().join("logs").join("run.log")).unwrap();
    assert!(log.contains("INFO: [1/1] Cleaning accounts.csv"));
    assert!(log.contains("accounts.csv: name column, 4 -> 3 rows"));
}
