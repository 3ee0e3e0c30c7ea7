//! Convert command - consolidate a batch of NFe XML files into one table.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use tracing::debug;

use nfex_core::fields::{coerce_datetime, format_currency_brl};
use nfex_core::{
    Cell, Consolidator, Diagnostic, FieldMapping, FillStrategy, Severity, Table,
    PROCESSED_AT_COLUMN, SOURCE_FILE_COLUMN,
};

/// Arguments for the convert command.
#[derive(Args)]
pub struct ConvertArgs {
    /// Input XML files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Column used by the date range filter
    #[arg(long, default_value = "Data de Emissão")]
    date_column: String,

    /// Keep rows issued on or after this date (e.g. 01/01/2024)
    #[arg(long)]
    from: Option<String>,

    /// Keep rows issued on or before this date
    #[arg(long)]
    to: Option<String>,

    /// Column used by the value range filter
    #[arg(long, default_value = "Valor Total")]
    value_column: String,

    /// Keep rows with value >= this amount
    #[arg(long)]
    min: Option<Decimal>,

    /// Keep rows with value <= this amount
    #[arg(long)]
    max: Option<Decimal>,

    /// Remove duplicate rows (full-row equality)
    #[arg(long)]
    dedupe: bool,

    /// Columns considered by --dedupe (comma separated; default all)
    #[arg(long, value_delimiter = ',')]
    dedupe_by: Vec<String>,

    /// Fill missing values before export
    #[arg(long, value_enum)]
    fill: Option<FillArg>,

    /// Columns to include in the output (comma separated; default all)
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,

    /// Custom field mapping (JSON file) replacing the built-in NFe mapping
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Keep the provenance columns in the export
    #[arg(long)]
    provenance: bool,

    /// Report unresolved fields per document
    #[arg(long)]
    report_missing: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Comma-separated values
    Csv,
    /// JSON array of records
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum FillArg {
    /// Zeros for numeric columns, empty strings elsewhere
    Empty,
    /// Zeros everywhere
    Zero,
    /// Column mean for numeric columns
    Mean,
    /// Propagate the last seen value downward
    Forward,
}

impl From<FillArg> for FillStrategy {
    fn from(arg: FillArg) -> Self {
        match arg {
            FillArg::Empty => FillStrategy::Empty,
            FillArg::Zero => FillStrategy::Zero,
            FillArg::Mean => FillStrategy::Mean,
            FillArg::Forward => FillStrategy::Forward,
        }
    }
}

pub fn run(args: ConvertArgs) -> anyhow::Result<()> {
    let start = Instant::now();

    let files = expand_inputs(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("no XML files matched: {}", args.inputs.join(", "));
    }

    println!(
        "{} Found {} XML files to process",
        style("ℹ").blue(),
        files.len()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut documents = Vec::with_capacity(files.len());
    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match fs::read(path) {
            Ok(content) => documents.push((name, content)),
            Err(err) => eprintln!(
                "{} {}: {}",
                style("✗").red(),
                path.display(),
                err
            ),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let consolidator = match &args.mapping {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("cannot read mapping {}", path.display()))?;
            let mapping: FieldMapping = serde_json::from_str(&text)
                .with_context(|| format!("invalid mapping {}", path.display()))?;
            Consolidator::new(mapping)?
        }
        None => Consolidator::nfe(),
    }
    .with_missing_field_reports(args.report_missing);
    let outcome = consolidator.consolidate(documents);
    let mut diagnostics = outcome.diagnostics;

    let table = apply_transforms(&args, outcome.table, &mut diagnostics)?;

    report(&diagnostics, outcome.processed, outcome.skipped, &table);

    let rendered = match args.format {
        OutputFormat::Csv => render_csv(&table)?,
        OutputFormat::Json => serde_json::to_string_pretty(&table)? + "\n",
    };

    match &args.output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("cannot write {}", path.display()))?;
            println!(
                "{} Wrote {} rows to {}",
                style("✓").green(),
                table.num_rows(),
                path.display()
            );
        }
        None => {
            std::io::stdout().write_all(rendered.as_bytes())?;
        }
    }

    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "convert finished");
    Ok(())
}

/// Expand literal paths and glob patterns, keeping only `.xml` files.
fn expand_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        for entry in glob(input).with_context(|| format!("bad pattern: {input}"))? {
            let path = entry?;
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            if ext == "xml" {
                files.push(path);
            }
        }
    }
    Ok(files)
}

/// Apply the optional transforms in the fixed pipeline order: date filter,
/// value filter, dedupe, fill, column selection.
fn apply_transforms(
    args: &ConvertArgs,
    table: Table,
    diags: &mut Vec<Diagnostic>,
) -> anyhow::Result<Table> {
    let from = parse_bound(args.from.as_deref())?;
    let to = parse_bound(args.to.as_deref())?;

    let mut table = table;
    if from.is_some() || to.is_some() {
        table = table.filter_by_date_range(&args.date_column, from, to, diags);
    }
    if args.min.is_some() || args.max.is_some() {
        table = table.filter_by_value_range(&args.value_column, args.min, args.max, diags);
    }
    if args.dedupe {
        let subset = if args.dedupe_by.is_empty() {
            None
        } else {
            Some(args.dedupe_by.as_slice())
        };
        table = table.remove_duplicates(subset, diags);
    }
    if let Some(fill) = args.fill {
        table = table.fill_missing(fill.into(), diags);
    }

    let selection = if !args.fields.is_empty() {
        args.fields.clone()
    } else if args.provenance {
        Vec::new()
    } else {
        // Provenance columns stay internal unless asked for.
        table
            .columns()
            .iter()
            .filter(|c| *c != SOURCE_FILE_COLUMN && *c != PROCESSED_AT_COLUMN)
            .cloned()
            .collect()
    };
    if !selection.is_empty() {
        table = table.select_columns(&selection, diags);
    }
    Ok(table)
}

fn parse_bound(value: Option<&str>) -> anyhow::Result<Option<chrono::NaiveDateTime>> {
    match value {
        None => Ok(None),
        Some(raw) => coerce_datetime(raw)
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("unrecognized date: {raw}")),
    }
}

fn report(diagnostics: &[Diagnostic], processed: usize, skipped: usize, table: &Table) {
    for diag in diagnostics {
        match diag.severity {
            Severity::Error => eprintln!("{} {}", style("✗").red(), diag),
            Severity::Warning => eprintln!("{} {}", style("⚠").yellow(), diag),
            Severity::Info => debug!("{diag}"),
        }
    }

    if skipped > 0 {
        println!(
            "{} {} of {} documents skipped",
            style("⚠").yellow(),
            skipped,
            processed + skipped
        );
    }
    if table.is_empty() {
        println!("{} No records to show", style("ℹ").blue());
    } else {
        println!(
            "{} {} records, {} columns",
            style("✓").green(),
            table.num_rows(),
            table.num_columns()
        );
        if let Some(total) = batch_total(table) {
            println!(
                "{} Valor Total: {}",
                style("ℹ").blue(),
                format_currency_brl(total)
            );
        }
    }
}

/// Sum of the "Valor Total" column, when present.
fn batch_total(table: &Table) -> Option<Decimal> {
    let index = table.column_index("Valor Total")?;
    Some(table.column_cells(index).filter_map(Cell::as_number).sum())
}

/// Render the table as CSV; dates use the Brazilian spreadsheet format.
fn render_csv(table: &Table) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(csv_cell))?;
    }
    let bytes = writer.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}

fn csv_cell(cell: &Cell) -> String {
    match cell {
        Cell::DateTime(dt) => dt.format("%d/%m/%Y %H:%M:%S").to_string(),
        other => other.to_string(),
    }
}
