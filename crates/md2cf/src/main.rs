//! md2cf CLI - Markdown to Confluence storage format.
//!
//! Provides commands for:
//! - `convert`: Convert a Markdown file, rendering diagrams into attachments
//! - `log`: Show the tail of the renderer diagnostic log

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ConvertArgs, LogArgs};
use output::Output;

/// md2cf - Markdown to Confluence storage format converter.
#[derive(Parser)]
#[command(name = "md2cf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a Markdown file to Confluence storage XHTML.
    Convert(ConvertArgs),
    /// Show the most recent renderer diagnostics.
    Log(LogArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = matches!(&cli.command, Commands::Convert(args) if args.verbose);

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Convert(args) => args.execute(),
        Commands::Log(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
