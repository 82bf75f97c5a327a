use super::helpers;
use super::{GlobalConfiguration, Subcommand};
use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use ra4plot::plot::{self, PlotOptions};
use std::path::PathBuf;
use std::process::ExitCode;

/// Draw the results figure into a PDF file.
#[derive(Parser)]
pub struct Opts {
    /// Add the preliminary label and name the output accordingly.
    #[arg(long)]
    preliminary: bool,
    /// Add a panel with the pull of every bin.
    #[arg(long)]
    pulls: bool,
    /// Overlay the signal+background expectation.
    #[arg(long)]
    signal: bool,
    /// Write the figure to FILE instead of the plots directory.
    #[arg(long, short, value_hint = ValueHint::FilePath, value_name = "FILE")]
    output: Option<PathBuf>,
}

impl Subcommand for Opts {
    fn run(&self, cfg: &GlobalConfiguration) -> Result<ExitCode> {
        let results = helpers::load_results(cfg)?;
        let options = PlotOptions {
            preliminary: self.preliminary,
            pulls: self.pulls,
            signal: self.signal,
        };
        let output = self.output.clone().unwrap_or_else(|| options.output());

        plot::render(&output, &results, &options)
            .with_context(|| format!("could not draw `{}`", output.display()))?;

        Ok(ExitCode::SUCCESS)
    }
}
