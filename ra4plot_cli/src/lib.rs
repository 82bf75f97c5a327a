//! Command-line front end of `ra4plot`.

mod export;
mod helpers;
mod plot;
mod pull;

use anyhow::Result;
use clap::{Parser, ValueHint};
use enum_dispatch::enum_dispatch;
use git_version::git_version;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
pub struct GlobalConfiguration {
    /// Directory containing the fit results and the datacard.
    #[arg(default_value = ".", long, value_hint = ValueHint::DirPath, value_name = "DIR")]
    pub input_dir: PathBuf,
    /// Replace the built-in bin layout with a YAML file.
    #[arg(long, value_hint = ValueHint::FilePath, value_name = "FILE")]
    pub layout: Option<PathBuf>,
}

/// A subcommand of the `ra4plot` binary.
#[enum_dispatch]
pub trait Subcommand {
    /// Runs the subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs can not be read or the output can not be written.
    fn run(&self, cfg: &GlobalConfiguration) -> Result<ExitCode>;
}

#[enum_dispatch(Subcommand)]
#[derive(Parser)]
pub enum SubcommandEnum {
    Export(export::Opts),
    Plot(plot::Opts),
    Pull(pull::Opts),
}

#[derive(Parser)]
#[command(
    arg_required_else_help = true,
    author,
    about,
    disable_help_subcommand = true,
    name = "ra4plot",
    version = git_version!(
        args = ["--always", "--dirty", "--long", "--tags"],
        cargo_prefix = "",
        fallback = "unknown"
    )
)]
pub struct Opts {
    #[command(flatten)]
    pub configuration: GlobalConfiguration,
    #[command(subcommand)]
    pub subcommand: SubcommandEnum,
}
