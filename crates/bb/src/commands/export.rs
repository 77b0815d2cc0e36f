//! `bb export` command implementation.

use bb_markup::{EditableNode, Exporter, parse_editable_html};
use clap::{Args, ValueEnum};

use super::{InputArgs, write_result};
use crate::error::CliError;

/// How the editable tree is supplied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum TreeFormat {
    /// HTML produced by the editing surface.
    #[default]
    Html,
    /// The tree serialized as JSON.
    Json,
}

/// Arguments for the export command.
#[derive(Args)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Input format of the editable tree.
    #[arg(short, long, value_enum, default_value_t)]
    format: TreeFormat,
}

impl ExportArgs {
    /// Convert an editable tree back to markup.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or input cannot be read, or the
    /// input is not a readable tree.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let config = self.input.load_config()?;
        let input = self.input.read(&config)?;

        let tree = parse_tree(&input, self.format)?;
        let exporter = Exporter::new(config.export_options());
        write_result(&exporter.export(&tree))
    }
}

pub(crate) fn parse_tree(input: &str, format: TreeFormat) -> Result<EditableNode, CliError> {
    tracing::debug!(bytes = input.len(), ?format, "Reading editable tree");
    let tree = match format {
        TreeFormat::Html => parse_editable_html(input)?,
        TreeFormat::Json => serde_json::from_str(input)?,
    };
    Ok(tree)
}
