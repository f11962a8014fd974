//! CLI integration tests for datacopy.
//!
//! These tests verify command-line argument parsing, help output,
//! exit codes and a small end-to-end transfer between XML data sets.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;

/// Get a command for the datacopy binary.
fn cmd() -> Command {
    Command::cargo_bin("datacopy").unwrap()
}

fn write_config(dir: &Path, yaml: &str) -> std::path::PathBuf {
    let path = dir.join("datacopy.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

const STOCK_DOCUMENT: &str = r#"<table>
  <metadata name="STOCK">
    <column name="id" type="INTEGER" primaryKey="true"/>
    <column name="item" type="STRING" width="40" nullable="true"/>
  </metadata>
  <data>
    <record id="1" item="bolt"/>
    <record id="2" item="nut"/>
  </data>
</table>"#;

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("datacopy"));
}

#[test]
fn test_global_flags_and_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--progress"))
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("[default: datacopy.yaml]"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "check"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_section_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "source:").unwrap();
    writeln!(file, "  type: xml").unwrap();
    writeln!(file, "destination:").unwrap();
    writeln!(file, "  type: xml").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_spreadsheet_target_as_source_exits_with_code_1() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            "source:\n  type: spreadsheet\n  spreadsheet:\n    file: {0}/in.xlsx\ndestination:\n  type: xml\n  xml:\n    directory: {0}\n",
            dir.path().display()
        ),
    );

    cmd()
        .args(["--config", config.to_str().unwrap(), "run"])
        .assert()
        .code(1);
}

// =============================================================================
// Check Command
// =============================================================================

#[test]
fn test_check_reports_missing_source() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            "source:\n  type: xml\n  xml:\n    file: {0}/missing.zip\ndestination:\n  type: xml\n  xml:\n    directory: {0}\n",
            dir.path().display()
        ),
    );

    cmd()
        .args(["--config", config.to_str().unwrap(), "check"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Source: NOT READY"))
        .stdout(predicate::str::contains("Destination: READY"));
}

#[test]
fn test_check_json_when_ready() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    std::fs::create_dir(&input).unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            "source:\n  type: xml\n  xml:\n    directory: {}\ndestination:\n  type: xml\n  xml:\n    file: {}/out.zip\n",
            input.display(),
            dir.path().display()
        ),
    );

    cmd()
        .args(["--config", config.to_str().unwrap(), "--output-json", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ready\": true"))
        .stdout(predicate::str::contains("\"ready\": false").not());
}

// =============================================================================
// Run Command
// =============================================================================

#[test]
fn test_run_copies_directory_to_archive() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    std::fs::create_dir(&input).unwrap();
    std::fs::write(input.join("STOCK.xml"), STOCK_DOCUMENT).unwrap();
    let archive = dir.path().join("out.zip");
    let config = write_config(
        dir.path(),
        &format!(
            "source:\n  type: xml\n  xml:\n    directory: {}\ndestination:\n  type: xml\n  xml:\n    file: {}\n",
            input.display(),
            archive.display()
        ),
    );

    cmd()
        .args(["--config", config.to_str().unwrap(), "--output-json", "run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"completed\""))
        .stdout(predicate::str::contains("\"tables\": 1"))
        .stdout(predicate::str::contains("\"records\": 2"));

    assert!(archive.is_file());
}

#[test]
fn test_progress_bar_leaves_json_output_clean() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    std::fs::create_dir(&input).unwrap();
    std::fs::write(input.join("STOCK.xml"), STOCK_DOCUMENT).unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            "source:\n  type: xml\n  xml:\n    directory: {}\ndestination:\n  type: xml\n  xml:\n    file: {}/out.zip\n",
            input.display(),
            dir.path().display()
        ),
    );

    cmd()
        .args([
            "--config",
            config.to_str().unwrap(),
            "--progress",
            "--output-json",
            "--verbosity",
            "error",
            "run",
        ])
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{"))
        .stdout(predicate::str::contains("[").not())
        .stderr(predicate::str::contains(format!("\r[{}]", ".".repeat(50))));
}

#[test]
fn test_run_logs_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    std::fs::create_dir(&input).unwrap();
    std::fs::create_dir(&output).unwrap();
    std::fs::write(input.join("STOCK.xml"), STOCK_DOCUMENT).unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            "source:\n  type: xml\n  xml:\n    directory: {}\ndestination:\n  type: xml\n  xml:\n    directory: {}\n",
            input.display(),
            output.display()
        ),
    );

    cmd()
        .args(["--config", config.to_str().unwrap(), "run"])
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stdout(predicate::str::contains("Transfer completed!"))
        .stderr(predicate::str::contains("Starting transfer"));

    let written = std::fs::read_to_string(output.join("STOCK.xml")).unwrap();
    assert!(written.contains("bolt"));
}
