//! bb CLI - BBCode markup conversion.
//!
//! Provides commands for:
//! - `render`: Markup to sanitized display HTML
//! - `import`: Markup to rich-text editor seed HTML
//! - `export`: Editor HTML or JSON tree back to markup
//! - `roundtrip`: Check that an edit cycle is stable

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ExportArgs, ImportArgs, RenderArgs, RoundtripArgs};
use output::Output;

/// bb - BBCode markup conversion.
#[derive(Parser)]
#[command(name = "bb", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render markup to sanitized HTML.
    Render(RenderArgs),
    /// Convert markup to editor seed HTML.
    Import(ImportArgs),
    /// Convert an editor tree back to markup.
    Export(ExportArgs),
    /// Run markup through two edit cycles and report stability.
    Roundtrip(RoundtripArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Render(args) => args.input.verbose,
            Self::Import(args) => args.input.verbose,
            Self::Export(args) => args.input.verbose,
            Self::Roundtrip(args) => args.input.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables DEBUG level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Import(args) => args.execute(),
        Commands::Export(args) => args.execute(),
        Commands::Roundtrip(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
