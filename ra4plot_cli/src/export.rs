use super::helpers;
use super::{GlobalConfiguration, Subcommand};
use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use std::path::PathBuf;
use std::process::ExitCode;

/// Write the pre-fit, post-fit and observed yields to a YAML file.
#[derive(Parser)]
pub struct Opts {
    /// Path of the YAML file.
    #[arg(
        default_value = "SUS-20-007_fitresults.yaml",
        long,
        short,
        value_hint = ValueHint::FilePath,
        value_name = "FILE"
    )]
    output: PathBuf,
}

impl Subcommand for Opts {
    fn run(&self, cfg: &GlobalConfiguration) -> Result<ExitCode> {
        let results = helpers::load_results(cfg)?;

        results
            .summary()
            .write(&self.output)
            .with_context(|| format!("could not write `{}`", self.output.display()))?;

        Ok(ExitCode::SUCCESS)
    }
}
