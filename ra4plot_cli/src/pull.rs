use super::helpers;
use super::{GlobalConfiguration, Subcommand};
use anyhow::Result;
use clap::Parser;
use prettytable::{cell, Row};
use std::process::ExitCode;

/// Show the yields and pulls of every bin.
#[derive(Parser)]
pub struct Opts {
    /// Set the number of fractional digits shown.
    #[arg(default_value_t = 2, long)]
    digits: usize,
}

impl Subcommand for Opts {
    fn run(&self, cfg: &GlobalConfiguration) -> Result<ExitCode> {
        let results = helpers::load_results(cfg)?;
        let digits = self.digits;

        let mut title = Row::empty();
        for label in [
            "b", "bin", "region", "pre-fit", "+", "-", "post-fit", "+", "-", "data", "+", "-",
            "sig+bkg", "pull pre", "pull post", "pull sig",
        ] {
            title.add_cell(cell!(c->label));
        }

        let mut table = helpers::create_table();
        table.set_titles(title);

        for (index, bin) in results.bins().iter().enumerate() {
            let mut row = Row::empty();
            row.add_cell(cell!(r->format!("{index}")));
            row.add_cell(cell!(l->&bin.name));
            row.add_cell(cell!(l->&bin.region));

            for value in [
                bin.prefit.value,
                bin.prefit.up(),
                bin.prefit.down(),
                bin.postfit.value,
                bin.postfit.up(),
                bin.postfit.down(),
                bin.data,
                bin.data_error.up,
                bin.data_error.down,
                bin.signal,
            ] {
                row.add_cell(cell!(r->format!("{value:.digits$}")));
            }

            // degenerate pulls were already reported when computing them
            for pull in [bin.pulls.prefit, bin.pulls.postfit, bin.pulls.signal] {
                let pull = pull.map_or_else(|| "-".to_owned(), |pull| format!("{pull:.digits$}"));
                row.add_cell(cell!(r->pull));
            }

            table.add_row(row);
        }

        table.printstd();

        Ok(ExitCode::SUCCESS)
    }
}
