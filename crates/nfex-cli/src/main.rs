//! CLI application for converting NFe XML batches to tabular data.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{convert, fields};

/// NFe XML converter - consolidate electronic invoice XML files into CSV/JSON tables
#[derive(Parser)]
#[command(name = "nfex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a batch of XML files into a consolidated table
    Convert(convert::ConvertArgs),

    /// List the dotted field paths available in a sample XML document
    Fields(fields::FieldsArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Convert(args) => convert::run(args),
        Commands::Fields(args) => fields::run(args),
    }
}
