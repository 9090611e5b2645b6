use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use vischema::logging::init_tracing;
use vischema::{
    ImportError, ImportOptions, LayoutGrid, detect_foreign_keys, import_path, parse_document,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Log level (RUST_LOG overrides)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a .sql or .json file and print the validated schema document
    Import(ImportArgs),
    /// Validate a schema document
    Validate { input: PathBuf },
    /// Print foreign-key suggestions for a schema document
    Suggest { input: PathBuf },
}

#[derive(clap::Args)]
struct ImportArgs {
    input: PathBuf,
    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Schema name (defaults to the file stem)
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    pretty: bool,
    /// Horizontal distance between imported tables
    #[arg(long, default_value_t = LayoutGrid::default().step_x)]
    step_x: i64,
    /// Vertical distance between rows of imported tables
    #[arg(long, default_value_t = LayoutGrid::default().step_y)]
    step_y: i64,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let result = match cli.command {
        Commands::Import(args) => run_import(args),
        Commands::Validate { input } => run_validate(&input),
        Commands::Suggest { input } => run_suggest(&input),
    };

    if let Err(e) = result {
        eprintln!("{:#}", e);
        process::exit(1);
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn run_import(args: ImportArgs) -> Result<()> {
    let mut options = ImportOptions::default();
    options.grid.step_x = args.step_x;
    options.grid.step_y = args.step_y;

    let outcome = import_path(&args.input, args.name.as_deref(), &options)?;

    for warning in &outcome.warnings {
        eprintln!("warning: {}", warning);
    }

    let json = outcome.document.to_json(args.pretty)?;
    match args.output {
        Some(path) => fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

fn run_validate(input: &Path) -> Result<()> {
    let content = read(input)?;
    match parse_document(&content) {
        Ok(doc) => {
            println!(
                "{}: valid ({} tables, {} relationships)",
                input.display(),
                doc.tables.len(),
                doc.relationships.len()
            );
            Ok(())
        }
        Err(e @ ImportError::Validation(_)) => {
            Err(e).with_context(|| format!("{} is invalid", input.display()))
        }
        Err(e) => Err(e.into()),
    }
}

fn run_suggest(input: &Path) -> Result<()> {
    let content = read(input)?;
    let doc = parse_document(&content)?;
    let suggestions = detect_foreign_keys(&doc);
    tracing::info!(count = suggestions.len(), "foreign key suggestions");
    println!("{}", serde_json::to_string_pretty(&suggestions)?);
    Ok(())
}
