//! Fields command - discover which dotted paths a sample document carries.
//!
//! Useful when authoring a custom field mapping for an issuer whose XML
//! does not follow the standard NFe layout.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use console::style;

use nfex_core::parse_document;

/// Arguments for the fields command.
#[derive(Args)]
pub struct FieldsArgs {
    /// Sample XML document
    #[arg(required = true)]
    input: PathBuf,
}

pub fn run(args: FieldsArgs) -> anyhow::Result<()> {
    let content = fs::read(&args.input)
        .with_context(|| format!("cannot read {}", args.input.display()))?;
    let text = String::from_utf8_lossy(&content);
    let tree = parse_document(&text)
        .with_context(|| format!("cannot parse {}", args.input.display()))?;

    let paths = tree.paths();
    println!(
        "{} {} fields available in {}",
        style("ℹ").blue(),
        paths.len(),
        args.input.display()
    );
    for path in paths {
        println!("  {path}");
    }
    Ok(())
}
