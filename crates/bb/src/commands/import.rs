//! `bb import` command implementation.

use bb_markup::Importer;
use clap::Args;

use super::{InputArgs, write_result};
use crate::error::CliError;

/// Arguments for the import command.
#[derive(Args)]
pub(crate) struct ImportArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

impl ImportArgs {
    /// Convert markup to the HTML that seeds an editing surface.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or input cannot be read.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let config = self.input.load_config()?;
        let markup = self.input.read(&config)?;

        let importer = Importer::new(config.render_options());
        tracing::debug!(bytes = markup.len(), "Importing markup");
        write_result(&importer.import(&markup))
    }
}
