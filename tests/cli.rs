//! Black-box tests against the `tbasic` binary: write a program to a
//! temp file, run it, check stdout/exit code.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn program(src: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp program file");
    file.write_all(src.as_bytes()).expect("write program");
    file
}

#[test]
fn runs_a_small_program_to_completion() {
    let file = program("10 PRINT \"hello\"\n20 END\n");
    Command::cargo_bin("tbasic")
        .unwrap()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("hello"));
}

#[test]
fn for_loop_prints_each_iteration() {
    let file = program("10 FOR I = 1 TO 3\n20 PRINT I\n30 NEXT\n40 END\n");
    Command::cargo_bin("tbasic")
        .unwrap()
        .arg(file.path())
        .assert()
        .success()
        .stdout("1\n2\n3\n");
}

#[test]
fn division_by_zero_reports_error_but_still_exits_zero() {
    // A single error below the abort threshold is a normal completion:
    // exit status reflects abort-vs-normal-completion only.
    let file = program("10 PRINT 1 / 0\n20 END\n");
    Command::cargo_bin("tbasic")
        .unwrap()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("division by 0 is illegal"));
}

#[test]
fn excess_errors_abort_and_exit_nonzero() {
    let mut src = String::new();
    for n in 0..12 {
        src.push_str(&format!("{} PRINT 1 / 0\n", 10 + n * 10));
    }
    src.push_str("1000 END\n");
    let file = program(&src);
    Command::cargo_bin("tbasic")
        .unwrap()
        .arg(file.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Too many errors. Program aborted."));
}

#[test]
fn missing_file_reports_usage_and_exits_nonzero() {
    Command::cargo_bin("tbasic")
        .unwrap()
        .arg("/no/such/program.bas")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: tbasic"));
}

#[test]
fn no_argument_reports_usage_and_exits_one() {
    Command::cargo_bin("tbasic")
        .unwrap()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage: tbasic"));
}

#[test]
fn gosub_and_return_round_trip() {
    let file = program(
        "10 GOSUB 100\n20 PRINT \"back\"\n30 END\n100 PRINT \"sub\"\n110 RETURN\n",
    );
    Command::cargo_bin("tbasic")
        .unwrap()
        .arg(file.path())
        .assert()
        .success()
        .stdout("sub\nback\n");
}
