//! Grid sweep command line.
//!
//! `gridsweep sweep` loads a boundary, tiles it into cells, queries the
//! places API around every cell and writes the deduplicated places to CSV.
//! `gridsweep grid` only writes the cell centers, without any API calls.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use gridsweep::export::{write_grid, write_places_or_fallback, PlacesExport};
use gridsweep::notify::{summarize, Webhook};
use gridsweep::places::GooglePlacesClient;
use gridsweep::{generate_grid, load_boundary, DedupScope, SweepConfig, Sweeper};

#[derive(Parser, Debug)]
#[command(name = "gridsweep")]
#[command(about = "Sweep a places API over a grid covering a boundary polygon")]
struct Args {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query the places API at every grid cell and export the results
    Sweep(SweepArgs),
    /// Write the grid cell centers only
    Grid(GridArgs),
}

#[derive(ClapArgs, Debug)]
struct CommonArgs {
    /// GeoJSON boundary file (first feature is used)
    #[arg(short, long)]
    boundary: PathBuf,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Approximate number of grid cells
    #[arg(long)]
    target_cells: Option<u32>,
}

#[derive(ClapArgs, Debug)]
struct SweepArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Places API key
    #[arg(long, env = "GOOGLE_MAPS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Query label, used in the output filename
    #[arg(long)]
    query: Option<String>,

    /// Place type filter
    #[arg(long)]
    place_type: Option<String>,

    /// Free-text keyword
    #[arg(long)]
    keyword: Option<String>,

    /// Search radius in meters
    #[arg(long)]
    radius: Option<u32>,

    /// Region name, used in the output filename
    #[arg(long)]
    region: Option<String>,

    /// Deduplicate across the whole sweep or per cell
    #[arg(long, value_enum)]
    dedup_scope: Option<DedupScope>,

    /// Requests before a cooldown (0 disables)
    #[arg(long)]
    per_minute: Option<u32>,

    /// Requests per UTC day (0 disables)
    #[arg(long)]
    per_day: Option<u32>,

    /// Output CSV (default: {query}_in_{region}.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Discord-compatible webhook for start/finish notifications
    #[arg(long)]
    webhook: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct GridArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output CSV
    #[arg(short, long, default_value = "grid.csv")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Sweep(sweep_args) => run_sweep(sweep_args).await,
        Command::Grid(grid_args) => run_grid(grid_args),
    }
}

fn load_config(common: &CommonArgs) -> Result<SweepConfig> {
    let mut config = match &common.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            SweepConfig::load_from_file(path).context("Failed to load config file")?
        }
        None => SweepConfig::default(),
    };
    if let Some(target_cells) = common.target_cells {
        config.target_cells = target_cells;
    }
    Ok(config)
}

fn apply_overrides(config: &mut SweepConfig, args: &SweepArgs) {
    if let Some(query) = &args.query {
        config.query = query.clone();
    }
    if let Some(place_type) = &args.place_type {
        config.place_type = place_type.clone();
    }
    if let Some(keyword) = &args.keyword {
        config.keyword = Some(keyword.clone());
    }
    if let Some(radius) = args.radius {
        config.radius_m = radius;
    }
    if let Some(region) = &args.region {
        config.region = region.clone();
    }
    if let Some(scope) = args.dedup_scope {
        config.dedup_scope = scope;
    }
    if let Some(per_minute) = args.per_minute {
        config.quota.per_minute = per_minute;
    }
    if let Some(per_day) = args.per_day {
        config.quota.per_day = per_day;
    }
}

fn run_grid(args: GridArgs) -> Result<()> {
    let config = load_config(&args.common)?;
    config.validate()?;

    let boundary = load_boundary(&args.common.boundary).context("Failed to load boundary")?;
    let cells = generate_grid(&boundary, config.target_cells);
    if cells.is_empty() {
        warn!("No valid grid cells generated. Check the boundary GeoJSON.");
    }

    write_grid(&args.output, &cells).context("Failed to write grid")?;
    info!("Wrote {} cells to {}", cells.len(), args.output.display());
    Ok(())
}

async fn run_sweep(args: SweepArgs) -> Result<()> {
    let mut config = load_config(&args.common)?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    info!(
        "Query: {}, type: {}, radius: {} m, target cells: {}",
        config.query, config.place_type, config.radius_m, config.target_cells
    );
    info!(
        "Quota: {} requests before cooldown, {} per day",
        config.quota.per_minute, config.quota.per_day
    );

    let api_key = match &args.api_key {
        Some(key) if !key.trim().is_empty() => key.clone(),
        _ => anyhow::bail!("API key not found. Pass --api-key or set GOOGLE_MAPS_API_KEY"),
    };

    let boundary = load_boundary(&args.common.boundary).context("Failed to load boundary")?;
    let cells = generate_grid(&boundary, config.target_cells);
    if cells.is_empty() {
        warn!("No valid grid cells generated. Check the boundary GeoJSON.");
        return Ok(());
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(config.output_filename()));
    let output_name = output.display().to_string();

    let webhook = args.webhook.clone().map(Webhook::new);
    if let Some(ref hook) = webhook {
        let _ = hook
            .send_notification(
                "Sweep Started",
                &format!(
                    "Sweeping **{}** cells for **{}** in **{}**",
                    cells.len(),
                    config.query,
                    config.region
                ),
                true,
            )
            .await;
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping the sweep and keeping collected places");
                cancel.cancel();
            }
        });
    }

    let pb = ProgressBar::new(cells.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} cells ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let client = GooglePlacesClient::new(api_key).context("Failed to create places client")?;
    let mut sweeper = Sweeper::new(client, config)
        .with_cancellation(cancel)
        .with_progress(pb);

    let report = sweeper.sweep(&cells).await;

    let export_error = if report.records.is_empty() {
        warn!("No places found.");
        None
    } else {
        match write_places_or_fallback(&output, &report.records, &std::env::temp_dir()) {
            PlacesExport::Written(_) => None,
            PlacesExport::Fallback { error, saved_to } => Some(format!(
                "{}. Places were saved to {} instead",
                error,
                saved_to.display()
            )),
            PlacesExport::Failed {
                error,
                fallback_error,
            } => Some(format!("{}; fallback also failed: {}", error, fallback_error)),
        }
    };

    if let Some(message) = export_error {
        error!("Export failed: {}", message);
        if let Some(ref hook) = webhook {
            let _ = hook
                .send_notification(
                    "Export Failed",
                    &format!(
                        "{}\n\n{}",
                        summarize(&report.stats, report.records.len(), &output_name),
                        message
                    ),
                    false,
                )
                .await;
        }
        anyhow::bail!(
            "Failed to export {} places: {}",
            report.records.len(),
            message
        );
    }

    if let Some(ref hook) = webhook {
        let title = if report.stats.cancelled {
            "Sweep Cancelled"
        } else {
            "Sweep Complete"
        };
        let _ = hook
            .send_notification(
                title,
                &summarize(&report.stats, report.records.len(), &output_name),
                !report.stats.cancelled,
            )
            .await;
    }

    info!("Process completed.");
    Ok(())
}
