use super::GlobalConfiguration;
use anyhow::{Context, Result};
use prettytable::format::{FormatBuilder, LinePosition, LineSeparator};
use prettytable::Table;
use ra4plot::layout::Layout;
use ra4plot::results::Results;

pub fn create_table() -> Table {
    let mut table = Table::new();
    table.set_format(
        FormatBuilder::new()
            .column_separator(' ')
            .separator(LinePosition::Title, LineSeparator::new('-', '+', ' ', ' '))
            .build(),
    );
    table
}

pub fn load_results(cfg: &GlobalConfiguration) -> Result<Results> {
    let layout = match &cfg.layout {
        Some(path) => Layout::from_yaml(path)
            .with_context(|| format!("could not read layout `{}`", path.display()))?,
        None => Layout::default(),
    };

    Results::load(layout, &cfg.input_dir).with_context(|| {
        format!(
            "could not load the fit results in `{}`",
            cfg.input_dir.display()
        )
    })
}
