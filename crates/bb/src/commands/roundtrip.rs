//! `bb roundtrip` command implementation.

use bb_config::Config;
use bb_markup::{Exporter, Importer, parse_editable_html};
use clap::Args;

use super::{InputArgs, write_result};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the roundtrip command.
#[derive(Args)]
pub(crate) struct RoundtripArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Fail if a second edit cycle changes the result.
    #[arg(long)]
    check: bool,
}

/// Outcome of two consecutive edit cycles.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct RoundTrip {
    /// Markup after one import/export cycle.
    pub first: String,
    /// Markup after a second cycle over `first`.
    pub second: String,
}

impl RoundTrip {
    pub(crate) fn is_stable(&self) -> bool {
        self.first == self.second
    }
}

impl RoundtripArgs {
    /// Run markup through the editor import/export cycle twice.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or input cannot be read, or with
    /// `--check` when the second cycle is not a fixpoint.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.input.load_config()?;
        let markup = self.input.read(&config)?;

        let result = round_trip(&markup, &config)?;
        write_result(&result.first)?;

        if result.is_stable() {
            output.success("Round trip is stable");
            return Ok(());
        }

        output.warning("Round trip is not stable, a second cycle produced:");
        output.info(&result.second);
        if self.check {
            return Err(CliError::Validation(
                "markup changed on the second edit cycle".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Import and export `markup` twice with the configured options.
pub(crate) fn round_trip(markup: &str, config: &Config) -> Result<RoundTrip, CliError> {
    let importer = Importer::new(config.render_options());
    let exporter = Exporter::new(config.export_options());
    let cycle = |markup: &str| -> Result<String, CliError> {
        let tree = parse_editable_html(&importer.import(markup))?;
        Ok(exporter.export(&tree))
    };

    let first = cycle(markup)?;
    let second = cycle(&first)?;
    Ok(RoundTrip { first, second })
}
