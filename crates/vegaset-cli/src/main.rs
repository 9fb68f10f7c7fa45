//! Command-line interface for `vegaset`, a resolver and cache for versioned example datasets.
//!
//! This binary is a thin façade over [`vegaset_core`]: it parses arguments, configures
//! logging, builds a [`Loader`] for the requested backend and delegates to it.
//!
//! # Available Commands
//!
//! - `url` - Print the remote url of a dataset
//! - `load` - Download (or read from cache) and print a dataset
//! - `datasets` - List the newest catalog version and what the backend can read
//! - `backends` - List backends and whether this build supports them
//! - `cache` - Inspect and maintain the on-disk cache

mod display;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Level, debug, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use vegaset_core::{
    BackendId, CompiledFeatures, Loader, ReadOptions, VegasetError, backend_report,
};

#[derive(Parser)]
#[command(
    name = "vegaset",
    version,
    about = "Versioned example datasets, resolved and cached",
    long_about = "vegaset resolves dataset names against a versioned catalog, picks a backend\n\
                  that can parse the artifact, and caches downloads by content hash."
)]
/// Command-line arguments and options for the `vegaset` CLI.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    /// Cache directory; overrides `VEGASET_DATASETS_DIR`.
    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Backend to use (e.g. "arrow", "arrow[parquet]"). Defaults to the first available.
    #[arg(long, global = true, value_name = "BACKEND")]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Identifies one dataset artifact.
#[derive(clap::Args)]
struct DatasetArgs {
    /// Dataset name, optionally with its extension (e.g. "cars" or "cars.json").
    #[arg(value_name = "NAME")]
    name: String,

    /// File extension, when `NAME` has none (e.g. ".csv").
    #[arg(short, long)]
    suffix: Option<String>,

    /// Catalog version (e.g. "v2.9.0"). Ignored when `NAME` has an extension.
    #[arg(short, long)]
    tag: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Prints the remote url of a dataset.
    Url(DatasetArgs),

    /// Loads a dataset and prints its schema and first rows.
    Load {
        #[command(flatten)]
        dataset: DatasetArgs,

        /// Number of rows to print.
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Lists the newest catalog version and how the backend treats each artifact.
    Datasets,

    /// Lists all backends with their requirements and availability.
    Backends,

    /// Inspects and maintains the on-disk cache.
    #[command(subcommand)]
    Cache(CacheCommands),
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Prints the cache directory.
    Path,
    /// Removes every cached artifact the catalog knows.
    Clear,
    /// Removes cached artifacts that left the newest catalog version.
    Prune,
    /// Downloads every artifact of the newest catalog version.
    DownloadAll,
}

/// Entry point for the `vegaset` command-line interface.
///
/// Errors are reported with their user message and recovery suggestion, and turn
/// into a non-zero exit code.
fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(&cli) {
        eprintln!("Error: failed to initialise logging: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        },
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn report(err: &anyhow::Error) {
    debug!("Command failed: {err:?}");
    match err.downcast_ref::<VegasetError>() {
        Some(err) => {
            eprintln!("Error: {}", err.user_message());
            if let Some(suggestion) = err.recovery_suggestion() {
                eprintln!("\n{suggestion}");
            }
        },
        None => eprintln!("Error: {err:#}"),
    }
}

fn run(cli: Cli) -> Result<()> {
    let backend = cli
        .backend
        .as_deref()
        .map(str::parse::<BackendId>)
        .transpose()
        .map_err(VegasetError::from)?;

    match cli.command {
        Commands::Backends => {
            handle_backends(backend);
            Ok(())
        },
        Commands::Url(dataset) => {
            let loader = build_loader(backend, cli.cache_dir)?;
            handle_url(&loader, &dataset)
        },
        Commands::Load { dataset, limit } => {
            let loader = build_loader(backend, cli.cache_dir)?;
            handle_load(&loader, &dataset, limit)
        },
        Commands::Datasets => {
            let loader = build_loader(backend, cli.cache_dir)?;
            handle_datasets(&loader)
        },
        Commands::Cache(command) => {
            let loader = build_loader(backend, cli.cache_dir)?;
            handle_cache(&loader, &command)
        },
    }
}

fn build_loader(backend: Option<BackendId>, cache_dir: Option<PathBuf>) -> Result<Loader> {
    let loader = match backend {
        Some(id) => Loader::from_backend(id)?,
        None => Loader::infer()?,
    };
    if let Some(dir) = cache_dir {
        loader.set_cache_path(Some(dir.as_path()))?;
    }
    debug!(
        "Using backend '{}' with cache {:?}",
        loader.reader().backend(),
        loader.cache().location()
    );
    Ok(loader)
}

fn handle_url(loader: &Loader, dataset: &DatasetArgs) -> Result<()> {
    let url = loader.url(
        &dataset.name,
        dataset.suffix.as_deref(),
        dataset.tag.as_deref(),
    )?;
    println!("{url}");
    Ok(())
}

fn handle_load(loader: &Loader, dataset: &DatasetArgs, limit: usize) -> Result<()> {
    info!("Loading {}", dataset.name);
    let batch = loader.load(
        &dataset.name,
        dataset.suffix.as_deref(),
        dataset.tag.as_deref(),
        ReadOptions::default(),
    )?;
    display::display_batch(&batch, limit)
}

fn handle_datasets(loader: &Loader) -> Result<()> {
    let profile = loader.reader().profile()?;
    display::display_datasets(loader.reader().backend(), &profile);
    Ok(())
}

fn handle_backends(requested: Option<BackendId>) {
    let report = backend_report(&CompiledFeatures);
    let selected = requested.or_else(|| {
        report
            .iter()
            .find(|status| status.probe.is_available())
            .map(|status| status.id)
    });
    display::display_backends(&report, selected);
}

fn handle_cache(loader: &Loader, command: &CacheCommands) -> Result<()> {
    match command {
        CacheCommands::Path => {
            println!("{}", loader.cache_path()?.display());
        },
        CacheCommands::Clear => {
            let removed = loader.clear_cache()?;
            println!("Removed {removed} cached artifacts");
        },
        CacheCommands::Prune => {
            let removed = loader.prune_cache()?;
            println!("Removed {removed} stale artifacts");
        },
        CacheCommands::DownloadAll => {
            let summary = loader.download_all()?;
            println!(
                "Downloaded {} artifacts, {} already cached",
                summary.downloaded.len(),
                summary.already_cached
            );
        },
    }
    Ok(())
}
