#![allow(missing_docs)]

mod common;

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use std::fs;

const HELP_STR: &str = "Draw the results figure into a PDF file

Usage: ra4plot plot [OPTIONS]

Options:
      --preliminary    Add the preliminary label and name the output accordingly
      --pulls          Add a panel with the pull of every bin
      --signal         Overlay the signal+background expectation
  -o, --output <FILE>  Write the figure to FILE instead of the plots directory
  -h, --help           Print help
";

#[test]
fn help() {
    Command::cargo_bin("ra4plot")
        .unwrap()
        .args(["plot", "--help"])
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
        .arg("plot")
        .assert()
        .success();

    dir.child("plots/results_plot.pdf")
        .assert(predicate::path::is_file());
    dir.child("plots/results_plot_preliminary.pdf")
        .assert(predicate::path::missing());
}

#[test]
fn preliminary_with_pulls() {
    let dir = common::inputs();

    Command::cargo_bin("ra4plot")
        .unwrap()
        .current_dir(dir.path())
        .args(["plot", "--preliminary", "--pulls", "--signal"])
        .assert()
        .success();

    let output = dir.child("plots/results_plot_preliminary.pdf");

    output.assert(predicate::path::is_file());
    assert!(fs::read(output.path()).unwrap().starts_with(b"%PDF-"));
    dir.child("plots/results_plot.pdf")
        .assert(predicate::path::missing());
}

#[test]
fn output() {
    let dir = common::inputs();
    let output = dir.child("figure.pdf");

    Command::cargo_bin("ra4plot")
        .unwrap()
        .arg("--input-dir")
        .arg(dir.path())
        .args(["plot", "--pulls", "-o"])
        .arg(output.path())
        .assert()
        .success();

    output.assert(predicate::path::is_file());
}

#[test]
fn missing_inputs() {
    let dir = TempDir::new().unwrap();

    Command::cargo_bin("ra4plot")
        .unwrap()
        .current_dir(dir.path())
        .arg("plot")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not load the fit results in `.`"))
        .stderr(predicate::str::contains("multidimfit_prefit.yaml"));
}
