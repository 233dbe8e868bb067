use anyhow::{bail, Context};
use chrono::Utc;
use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{Parser, Subcommand};
use pdf_index_core::{
    default_config_path, BackgroundTask, FileValidator, IndexStorage, LopdfExtractor,
    PdfExtractor, ProgressSnapshot, SearchConfig, SearchEngine, SearchMode, TextNormalizer,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "pdf-index", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (JSON). Missing files fall back to defaults.
    #[arg(long, env = "PDF_INDEX_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the index files.
    #[arg(long, env = "PDF_INDEX_DIR")]
    index_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Validate every PDF under a directory.
    Scan {
        directory: PathBuf,
        /// Only look at the top-level directory.
        #[arg(long, default_value_t = false)]
        no_recursive: bool,
    },
    /// Index a directory and merge it into the persisted index.
    Index { directory: PathBuf },
    /// Query the persisted index.
    Search {
        query: String,
        /// occurrence (literal hit required) or similarity (token overlap).
        #[arg(long, default_value = "occurrence", value_parser = search_mode_parser())]
        mode: SearchMode,
        /// Maximum number of results; defaults to the configured max_results.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the most frequent normalized terms of one PDF.
    Keywords {
        file: PathBuf,
        #[arg(long, default_value = "20")]
        top: usize,
    },
    /// Show the index metadata.
    Info,
    /// Delete the index files.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = SearchConfig::load_or_default(&config_path);
    if let Some(dir) = &cli.index_dir {
        config.index_directory = Some(dir.clone());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        config = %config_path.display(),
        "pdf-index boot"
    );

    match cli.command {
        Command::Scan {
            directory,
            no_recursive,
        } => scan(&directory, !no_recursive).await?,
        Command::Index { directory } => {
            index(&config, &directory).await?;
            config.remember_last_directory(&directory);
            if let Err(error) = config.save(&config_path) {
                warn!(path = %config_path.display(), reason = %error, "cannot save config");
            }
        }
        Command::Search { query, mode, limit } => search(&config, &query, mode, limit).await?,
        Command::Keywords { file, top } => {
            let text = LopdfExtractor.extract_text(&file)?;
            let normalizer = TextNormalizer::from_config(&config)?;
            for (term, count) in normalizer.extract_keywords(&text, Some(top)) {
                println!("{count:>6}  {term}");
            }
        }
        Command::Info => {
            let storage = IndexStorage::from_config(&config)?;
            match storage.info() {
                Some(metadata) => {
                    println!("index: {}", storage.index_dir().display());
                    println!("version: {}", metadata.version);
                    println!("documents: {}", metadata.document_count);
                    println!("last_updated: {}", metadata.last_updated.to_rfc3339());
                    if let Some(checksum) = &metadata.checksum {
                        println!("checksum: {checksum}");
                    }
                    for path in &metadata.document_paths {
                        println!("  {path}");
                    }
                }
                None => println!("no index at {}", storage.index_dir().display()),
            }
        }
        Command::Clear => {
            let storage = IndexStorage::from_config(&config)?;
            if !storage.clear() {
                bail!("failed to clear index at {}", storage.index_dir().display());
            }
            println!("index cleared at {}", storage.index_dir().display());
        }
    }

    Ok(())
}

fn search_mode_parser() -> impl TypedValueParser<Value = SearchMode> {
    PossibleValuesParser::new(
        [SearchMode::Occurrence, SearchMode::Similarity].map(|mode| mode.as_str()),
    )
    .try_map(|raw| raw.parse::<SearchMode>())
}

fn progress_line(label: &'static str) -> impl FnMut(ProgressSnapshot) {
    move |snapshot| {
        eprint!(
            "\r{label}: {}/{} ({:.0}%)",
            snapshot.completed,
            snapshot.total,
            snapshot.fraction() * 100.0
        );
    }
}

async fn scan(directory: &Path, recursive: bool) -> anyhow::Result<()> {
    let validator = Arc::new(FileValidator::new());
    let worker = Arc::clone(&validator);
    let root = directory.to_path_buf();
    let task = BackgroundTask::spawn(format!("scan {}", directory.display()), move |progress| {
        worker.scan_with_progress(&root, recursive, progress)
    });
    let report = task
        .wait_with_progress(PROGRESS_INTERVAL, progress_line("scanning"))
        .await?;
    eprintln!();

    println!("{} valid PDF files found", report.valid_count());
    let invalid = validator.invalid_paths();
    if !invalid.is_empty() {
        println!("{} invalid files found", invalid.len());
        for (path, reason) in &invalid {
            println!("  {path}: {reason}");
        }
    }
    for failure in &report.failures {
        println!("  unreadable {}: {}", failure.path.display(), failure.reason);
    }
    Ok(())
}

async fn index(config: &SearchConfig, directory: &Path) -> anyhow::Result<SearchEngine> {
    let storage = IndexStorage::from_config(config)?;
    let mut engine = SearchEngine::new(config.clone())?;
    if let Some(store) = storage.load() {
        engine.install(store);
    }

    let report = engine
        .spawn_indexing(directory.to_path_buf())
        .wait_with_progress(PROGRESS_INTERVAL, progress_line("indexing"))
        .await
        .with_context(|| format!("indexing {} failed", directory.display()))?;
    eprintln!();
    engine.install(Arc::clone(&report.store));

    if !storage.save(&engine.snapshot()) {
        bail!("failed to save index to {}", storage.index_dir().display());
    }

    println!(
        "{} documents indexed ({} in index) at {}",
        report.indexed,
        engine.document_count(),
        Utc::now().to_rfc3339()
    );
    if report.scan.invalid_count() > 0 {
        println!("{} invalid files found", report.scan.invalid_count());
    }
    for skipped in &report.skipped_files {
        println!("  skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    Ok(engine)
}

async fn search(
    config: &SearchConfig,
    query: &str,
    mode: SearchMode,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let storage = IndexStorage::from_config(config)?;
    let engine = match storage.load() {
        Some(store) => {
            let mut engine = SearchEngine::new(config.clone())?;
            engine.install(store);
            engine
        }
        None => match (&config.last_directory, config.auto_index) {
            (Some(directory), true) => {
                info!(directory = %directory.display(), "no index on disk, indexing last directory");
                index(config, directory).await?
            }
            _ => {
                println!("no index found; run `pdf-index index <dir>` first");
                return Ok(());
            }
        },
    };

    let results = engine.search_with_mode(query, mode);
    let limit = limit.unwrap_or(config.max_results);
    println!("query: {query} ({} hits, mode={mode})", results.len());
    for result in results.iter().take(limit) {
        println!("score={:.4} {} ({})", result.score, result.title, result.file_path);
        for snippet in &result.matches {
            println!("  {snippet}");
        }
    }
    Ok(())
}
