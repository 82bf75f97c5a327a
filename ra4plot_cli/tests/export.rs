#![allow(missing_docs)]

mod common;

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

const HELP_STR: &str = "Write the pre-fit, post-fit and observed yields to a YAML file

Usage: ra4plot export [OPTIONS]

Options:
  -o, --output <FILE>  Path of the YAML file [default: SUS-20-007_fitresults.yaml]
  -h, --help           Print help
";

#[test]
fn help() {
    Command::cargo_bin("ra4plot")
        .unwrap()
        .args(["export", "--help"])
        .assert()
        .success()
        .stdout(HELP_STR);
}

#[test]
fn default() {
    let dir = common::inputs();

    Command::cargo_bin("ra4plot")
        .unwrap()
        .current_dir(dir.path())
        .arg("export")
        .assert()
        .success()
        .stdout("");

    let output = dir.child("SUS-20-007_fitresults.yaml");

    output.assert(predicate::str::contains("prefit_values:"));
    output.assert(predicate::str::contains("postfit_values:"));
    output.assert(predicate::str::contains("observed_values:"));
    output.assert(predicate::str::contains("name: ch23"));
    output.assert(predicate::str::contains("name: n_exp_bin50"));
}

#[test]
fn output_in_new_directory() {
    let dir = common::inputs();
    let output = dir.child("summary").child("fit.yaml");

    Command::cargo_bin("ra4plot")
        .unwrap()
        .arg("--input-dir")
        .arg(dir.path())
        .args(["export", "-o"])
        .arg(output.path())
        .assert()
        .success();

    output.assert(predicate::path::is_file());
}
