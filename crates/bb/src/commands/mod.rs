//! CLI command implementations.

pub(crate) mod export;
pub(crate) mod import;
pub(crate) mod render;
pub(crate) mod roundtrip;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use bb_config::{CliSettings, Config};
use clap::Args;

use crate::error::CliError;

pub(crate) use export::ExportArgs;
pub(crate) use import::ImportArgs;
pub(crate) use render::RenderArgs;
pub(crate) use roundtrip::RoundtripArgs;

/// Input and configuration arguments shared by every command.
#[derive(Args)]
pub(crate) struct InputArgs {
    /// Input file (default: read standard input).
    file: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover bb.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Largest accepted input in bytes (overrides config).
    #[arg(long)]
    max_bytes: Option<usize>,

    /// Video embed host (overrides config).
    #[arg(long)]
    youtube_host: Option<String>,

    /// Enable verbose output (log recovery decisions).
    #[arg(short, long)]
    pub verbose: bool,
}

impl InputArgs {
    /// Load configuration with CLI overrides applied.
    pub(crate) fn load_config(&self) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            max_bytes: self.max_bytes,
            youtube_host: self.youtube_host.clone(),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            tracing::debug!(path = %path.display(), "Loaded configuration");
        }
        Ok(config)
    }

    /// Read the input file or standard input, bounded by the configured limit.
    pub(crate) fn read(&self, config: &Config) -> Result<String, CliError> {
        let limit = config.input.max_bytes;
        match &self.file {
            Some(path) => read_file(path, limit),
            None => read_bounded(std::io::stdin().lock(), limit),
        }
    }
}

fn read_file(path: &Path, limit: usize) -> Result<String, CliError> {
    let size = usize::try_from(std::fs::metadata(path)?.len()).unwrap_or(usize::MAX);
    if size > limit {
        return Err(CliError::InputTooLarge { size, limit });
    }
    read_bounded(std::fs::File::open(path)?, limit)
}

/// Read at most `limit` bytes of UTF-8, failing if there is more.
fn read_bounded(reader: impl Read, limit: usize) -> Result<String, CliError> {
    let mut input = String::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    reader.take(cap).read_to_string(&mut input)?;
    if input.len() > limit {
        return Err(CliError::InputTooLarge {
            size: input.len(),
            limit,
        });
    }
    Ok(input)
}

/// Write a conversion result to standard output.
pub(crate) fn write_result(result: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(result.as_bytes())?;
    if !result.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_read_bounded_within_limit() {
        let input = read_bounded("[b]x[/b]".as_bytes(), 8).unwrap();
        assert_eq!(input, "[b]x[/b]");
    }

    #[test]
    fn test_read_bounded_over_limit() {
        let err = read_bounded("[b]x[/b]".as_bytes(), 4).unwrap_err();
        assert!(matches!(err, CliError::InputTooLarge { size: 5, limit: 4 }));
    }

    #[test]
    fn test_read_bounded_rejects_invalid_utf8() {
        let err = read_bounded(&[0xff, 0xfe][..], 16).unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }

    #[test]
    fn test_read_file_checks_size_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post.bb");
        std::fs::write(&path, "0123456789").unwrap();

        let err = read_file(&path, 4).unwrap_err();
        assert!(matches!(err, CliError::InputTooLarge { size: 10, limit: 4 }));
        assert_eq!(read_file(&path, 10).unwrap(), "0123456789");
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file(&dir.path().join("missing.bb"), 4).unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }
}
