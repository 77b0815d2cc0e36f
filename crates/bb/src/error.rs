//! CLI error types.

use bb_config::ConfigError;
use bb_markup::TreeError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid editor HTML: {0}")]
    Tree(#[from] TreeError),

    #[error("invalid editor JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("input exceeds the {limit} byte limit ({size} bytes read)")]
    InputTooLarge { size: usize, limit: usize },

    #[error("{0}")]
    Validation(String),
}
