//! # Hoist Catalog CLI (`hcat`)
//!
//! The `hcat` binary runs the normalization pipeline, inspects the result
//! and serves the catalog over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! hcat --config ./config/hcat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `hcat pipeline` | Normalize, dedupe and gate raw records into a snapshot |
//! | `hcat quality` | Print the latest quality report |
//! | `hcat search [QUERY]` | Filter, sort and page the catalog |
//! | `hcat get <id>` | Print one record as JSON |
//! | `hcat facets` | Print the sorted filter value lists |
//! | `hcat serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! # Rebuild the catalog from ./raw
//! hcat pipeline --config ./config/hcat.toml
//!
//! # D8+ hoists between 501 and 1000 kg, fastest first
//! hcat search --classification d8+ --capacity "501-1000 kg" --sort speed --order desc
//!
//! # Serve the API with debug logging
//! hcat -vv serve
//! ```

use clap::{Parser, Subcommand};
use hoist_catalog::{config, get, pipeline, search, server, stats};
use hoist_catalog_core::query::QueryParams;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Hoist Catalog CLI: normalize, index and serve lifting-equipment specs.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/hcat.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "hcat",
    about = "Hoist Catalog: normalize, index and serve lifting-equipment specifications",
    version,
    long_about = "Hoist Catalog turns noisy, partially-structured product records from scrapers, \
    manual entry and merged feeds into a deduplicated, quality-gated catalog, and answers \
    filtered, sorted, paginated queries over it from the CLI or a JSON HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/hcat.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the catalog snapshot from the raw record source.
    ///
    /// Scans `[sources.raw]`, normalizes every record, merges duplicates,
    /// evaluates the quality gates and writes the snapshot and report to
    /// `[store]`. Failing gates are reported but do not abort the run.
    Pipeline {
        /// Build and report without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of raw records to process.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the quality report of the last pipeline run.
    Quality,

    /// Query the catalog.
    Search {
        /// Free text matched against manufacturer, model, series, capacity
        /// and classification.
        query: Option<String>,

        #[arg(long)]
        manufacturer: Option<String>,

        /// Safety standard, e.g. `d8+` or `BGV-C1`.
        #[arg(long)]
        classification: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// `single`, `dual` or `variable`.
        #[arg(long)]
        speed_type: Option<String>,

        #[arg(long)]
        duty_cycle: Option<String>,

        /// `complete`, `partial`, `incomplete` or `minimal`.
        #[arg(long)]
        tier: Option<String>,

        /// Capacity bucket, e.g. `501-1000 kg`.
        #[arg(long)]
        capacity: Option<String>,

        /// Speed bucket, e.g. `4-8 m/min`.
        #[arg(long)]
        speed: Option<String>,

        /// Only records with images.
        #[arg(long)]
        images: bool,

        /// Only records with capacity, speed and power.
        #[arg(long)]
        complete: bool,

        /// Sort field: capacity, speed, completeness, classification or a
        /// text field such as manufacturer or model.
        #[arg(long)]
        sort: Option<String>,

        /// `asc` or `desc`.
        #[arg(long)]
        order: Option<String>,

        #[arg(long)]
        page: Option<String>,

        #[arg(long)]
        limit: Option<String>,

        /// Print the raw JSON result.
        #[arg(long)]
        json: bool,
    },

    /// Print one record as JSON.
    Get {
        /// Record id.
        id: String,
    },

    /// Print manufacturers, classifications and other filter values.
    Facets {
        #[arg(long)]
        json: bool,
    },

    /// Start the JSON HTTP API on `[server].bind`.
    Serve,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    // RUST_LOG wins over the flags when set.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Pipeline { dry_run, limit } => {
            pipeline::run_pipeline_cmd(&cfg, &pipeline::PipelineOptions { dry_run, limit }).await?;
        }
        Commands::Quality => {
            stats::run_quality(&cfg).await?;
        }
        Commands::Search {
            query,
            manufacturer,
            classification,
            category,
            speed_type,
            duty_cycle,
            tier,
            capacity,
            speed,
            images,
            complete,
            sort,
            order,
            page,
            limit,
            json,
        } => {
            let params = QueryParams {
                q: query,
                manufacturer,
                classification,
                category,
                speed_type,
                duty_cycle,
                tier,
                capacity,
                speed,
                has_images: images.then(|| "true".to_string()),
                complete_specs: complete.then(|| "true".to_string()),
                sort,
                order,
                page,
                limit,
            };
            search::run_search(&cfg, &params, json).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, &id).await?;
        }
        Commands::Facets { json } => {
            stats::run_facets(&cfg, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
