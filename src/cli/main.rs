use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use exif_renamer::config::{self, ExtractorBackend};
use exif_renamer::metadata::build_extractor;
use exif_renamer::pipeline::{Pipeline, RunReport};

#[derive(Parser, Debug)]
#[command(
    name = "exif-rename",
    version,
    about = "Rename photos and videos to canonical names derived from their capture time"
)]
struct Cli {
    /// Directory to process (walked recursively)
    #[arg(value_name = "DIRECTORY", required_unless_present = "init")]
    directory: Option<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Preview renames without touching any file
    #[arg(long)]
    dry_run: bool,

    /// Number of files processed concurrently
    #[arg(short, long, value_name = "N")]
    workers: Option<usize>,

    /// Read metadata with exiftool instead of the built-in reader
    #[arg(long)]
    exiftool: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let Some(directory) = cli.directory else {
        anyhow::bail!("No directory specified. Use --help for usage.");
    };

    // Load config, then apply CLI overrides
    let mut config = config::Config::load(cli.config.as_deref())?;
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if let Some(workers) = cli.workers {
        config.pipeline.workers = workers;
    }
    if cli.exiftool {
        config.extractor.backend = ExtractorBackend::ExifTool;
    }

    if config.output.dry_run {
        log::info!("DRY RUN — no files will be renamed");
    }

    let extractor = build_extractor(&config.extractor).await?;
    let report = Pipeline::new(extractor, &config).run(&directory).await?;

    for issue in &report.errors {
        log::error!("{issue}");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
    }

    let action = if report.dry_run { "would rename" } else { "renamed" };
    log::info!(
        "Done: {} {action}, {} already named, {} issue(s) out of {} file(s)",
        report.renamed.len(),
        report.already_canonical,
        report.errors.len(),
        report.discovered
    );

    Ok(())
}

fn report_json(report: &RunReport) -> serde_json::Value {
    let renamed: Vec<serde_json::Value> = report
        .renamed
        .iter()
        .map(|r| {
            serde_json::json!({
                "from": r.from.display().to_string(),
                "to": r.to.display().to_string(),
            })
        })
        .collect();
    let errors: Vec<serde_json::Value> = report
        .errors
        .iter()
        .map(|e| {
            serde_json::json!({
                "path": e.path.display().to_string(),
                "name": e.name(),
                "kind": e.error.kind(),
                "error": e.error.to_string(),
            })
        })
        .collect();

    serde_json::json!({
        "dry_run": report.dry_run,
        "discovered": report.discovered,
        "already_canonical": report.already_canonical,
        "renamed": renamed,
        "errors": errors,
    })
}
