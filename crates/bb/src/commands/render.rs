//! `bb render` command implementation.

use bb_markup::Renderer;
use clap::Args;

use super::{InputArgs, write_result};
use crate::error::CliError;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

impl RenderArgs {
    /// Render markup to sanitized display HTML.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or input cannot be read.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let config = self.input.load_config()?;
        let markup = self.input.read(&config)?;

        let renderer = Renderer::new(config.render_options());
        tracing::debug!(bytes = markup.len(), "Rendering markup");
        write_result(&renderer.render(&markup))
    }
}
