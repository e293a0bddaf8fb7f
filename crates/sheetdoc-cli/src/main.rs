//! sheetdoc CLI - Spreadsheet-to-Document Generation
//!
//! Command-line interface for generating one docx report per organizational
//! unit from a tracking spreadsheet and a template.

mod output;
mod report;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sheetdoc_core::{Variant, VariantConfig};
use sheetdoc_engine::{prepare, Driver};
use sheetdoc_parser::load_workbook;
use sheetdoc_render::DocxTemplate;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::report::InspectReport;

#[derive(Parser)]
#[command(name = "sheetdoc")]
#[command(author, version, about = "Spreadsheet-to-document generation engine", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one document per unit
    Generate {
        /// Input spreadsheet (xlsx, xlsm, xlsb, xls, ods)
        #[arg(value_name = "SPREADSHEET")]
        spreadsheet: PathBuf,

        /// Template document (.docx)
        #[arg(short, long, value_name = "DOCX")]
        template: PathBuf,

        #[command(flatten)]
        variant: VariantArgs,

        /// Directory the documents are written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// File name prefix for every document
        #[arg(long, default_value = "")]
        prefix: String,

        /// Processing date stamped into the documents (DD-MM-YYYY, default today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Build documents in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Show normalized columns, activity groups, date and units of a spreadsheet
    Inspect {
        /// Input spreadsheet
        #[arg(value_name = "SPREADSHEET")]
        spreadsheet: PathBuf,

        #[command(flatten)]
        variant: VariantArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print a built-in variant as TOML, as a starting point for --config
    Preset {
        #[arg(value_enum, default_value = "strategic")]
        variant: VariantName,
    },
}

#[derive(Args)]
struct VariantArgs {
    /// Built-in variant
    #[arg(long, value_enum, default_value = "strategic")]
    variant: VariantName,

    /// TOML variant config; overrides --variant
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantName {
    Strategic,
    Budget,
}

impl From<VariantName> for Variant {
    fn from(name: VariantName) -> Self {
        match name {
            VariantName::Strategic => Variant::StrategicActivities,
            VariantName::Budget => Variant::Budget,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl VariantArgs {
    fn resolve(&self) -> Result<VariantConfig> {
        match &self.config {
            Some(path) => VariantConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display())),
            None => Ok(Variant::from(self.variant).config()),
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%d-%m-%Y")
        .map_err(|e| format!("expected DD-MM-YYYY: {e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Generate {
            spreadsheet,
            template,
            variant,
            output_dir,
            prefix,
            date,
            parallel,
        } => {
            let config = variant.resolve()?;
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            cmd_generate(&spreadsheet, &template, config, &output_dir, &prefix, date, parallel)
        }
        Commands::Inspect {
            spreadsheet,
            variant,
            format,
        } => cmd_inspect(&spreadsheet, &variant.resolve()?, format),
        Commands::Preset { variant } => {
            print!("{}", Variant::from(variant).config().to_toml_string()?);
            Ok(())
        }
    }
}

fn cmd_generate(
    spreadsheet: &Path,
    template: &Path,
    config: VariantConfig,
    output_dir: &Path,
    prefix: &str,
    date: NaiveDate,
    parallel: bool,
) -> Result<()> {
    let raw = load_workbook(spreadsheet)
        .with_context(|| format!("failed to read spreadsheet {}", spreadsheet.display()))?;
    let template = DocxTemplate::open(template, &config)
        .with_context(|| format!("failed to load template {}", template.display()))?;

    let batch = Driver::new(config, template)
        .parallel(parallel)
        .run(&raw, date)?;
    let paths = output::write_batch(&batch, output_dir, prefix)?;

    info!(documents = paths.len(), dir = %output_dir.display(), "generation finished");
    for path in &paths {
        println!("{}", path.display());
    }
    println!("Generated {} document(s)", paths.len());
    Ok(())
}

fn cmd_inspect(spreadsheet: &Path, config: &VariantConfig, format: OutputFormat) -> Result<()> {
    let raw = load_workbook(spreadsheet)
        .with_context(|| format!("failed to read spreadsheet {}", spreadsheet.display()))?;
    let prepared = prepare(&raw, config)?;
    let report = InspectReport::new(&config.name, &prepared);

    match format {
        OutputFormat::Text => print!("{}", report.to_text()?),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }
    Ok(())
}
