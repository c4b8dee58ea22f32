use anyhow::Context;
use clap::{Parser, Subcommand};
use geomap::{IndexSettings, Mapping, ParsedDocument};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Parse, merge and apply field mappings
#[derive(Parser, Debug)]
#[command(name = "geomap")]
#[command(about = "Field mapping and merge engine", long_about = None)]
struct Args {
    /// Index settings JSON (flat `index.*` keys)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and validate a mapping, print its normalized form
    Check { mapping: PathBuf },
    /// Merge an update into a mapping, print the result
    Merge { current: PathBuf, update: PathBuf },
    /// Encode a file of JSON documents, one per line
    Index { mapping: PathBuf, documents: PathBuf },
}

#[derive(Debug, Serialize)]
struct DocumentSummary {
    line: usize,
    fields: usize,
    primitives: usize,
    ignored: Vec<String>,
}

impl DocumentSummary {
    fn new(line: usize, document: &ParsedDocument) -> Self {
        let primitives = document
            .fields
            .iter()
            .filter(|f| matches!(f.value, geomap::IndexableValue::Shape(_)))
            .count();
        Self {
            line,
            fields: document.fields.len(),
            primitives,
            ignored: document.ignored.clone(),
        }
    }
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn load_mapping(path: &Path, settings: &IndexSettings) -> anyhow::Result<Mapping> {
    let context = geomap::parser_context(settings.clone())?;
    let mapping = Mapping::parse(&read_json(path)?, &context)
        .with_context(|| format!("building mapping from {}", path.display()))?;
    Ok(mapping)
}

fn index_documents(mapping: &Mapping, path: &Path) -> anyhow::Result<Vec<DocumentSummary>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let lines: Vec<(usize, &str)> = raw
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line))
        .collect();

    lines
        .par_iter()
        .map(|(line, text)| -> anyhow::Result<DocumentSummary> {
            let source: serde_json::Value =
                serde_json::from_str(text).with_context(|| format!("line {}: invalid JSON", line))?;
            let document = mapping
                .parse_document(&source)
                .with_context(|| format!("line {}", line))?;
            Ok(DocumentSummary::new(*line, &document))
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = match &args.settings {
        Some(path) => IndexSettings::from_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => IndexSettings::new(),
    };

    match args.command {
        Command::Check { mapping } => {
            let mapping = load_mapping(&mapping, &settings)?;
            info!("Mapping valid: {} fields", mapping.lookup().len());
            println!("{}", serde_json::to_string_pretty(&mapping.to_json())?);
        }
        Command::Merge { current, update } => {
            let current = load_mapping(&current, &settings)?;
            let update = load_mapping(&update, &settings)?;
            let merged = current.merge(&update)?;
            info!("Merged mapping: {} fields", merged.lookup().len());
            println!("{}", serde_json::to_string_pretty(&merged.to_json())?);
        }
        Command::Index { mapping, documents } => {
            let mapping = load_mapping(&mapping, &settings)?;
            let summaries = index_documents(&mapping, &documents)?;
            info!("Encoded {} documents", summaries.len());
            for summary in &summaries {
                println!("{}", serde_json::to_string(summary)?);
            }
        }
    }

    Ok(())
}
