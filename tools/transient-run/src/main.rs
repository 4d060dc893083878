//! Transient run driver: load input fields from a directory of Field2D
//! JSON files, run the iteration loop, checkpoint wtd along the way.
//!
//! Input files are named `<key>.json` where the keys follow the
//! `{region}_*` / `{time_start}_*` convention of `TransientParams`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use wtm_core::{Field2D, FieldArena, FieldSink, FieldSource, TransientModel, TransientParams, WtmError};

#[derive(Parser, Debug)]
#[command(name = "transient-run", about = "Transient water-table model runner")]
struct Args {
    /// Path to a TransientParams JSON file. Omit to run with defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory containing the input field JSON files.
    #[arg(short, long, default_value = "data/fields")]
    data_dir: PathBuf,

    /// Directory for wtd snapshots (created if absent).
    #[arg(short, long, default_value = "data/output")]
    output_dir: PathBuf,

    /// Override the configured iteration count.
    #[arg(long)]
    iterations: Option<u64>,

    /// Override the configured checkpoint interval.
    #[arg(long)]
    checkpoint_interval: Option<u64>,

    /// Stop early once |total change| per iteration drops below this.
    #[arg(long)]
    convergence_threshold: Option<f64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Field store over a directory of `<key>.json` files.
struct JsonStore {
    read_dir: PathBuf,
    write_dir: PathBuf,
}

impl JsonStore {
    fn path_for(dir: &Path, key: &str) -> PathBuf {
        dir.join(format!("{key}.json"))
    }
}

impl FieldSource for JsonStore {
    fn load_field(&self, key: &str) -> Result<Field2D, WtmError> {
        let path = Self::path_for(&self.read_dir, key);
        if !path.exists() {
            return Err(WtmError::MissingField(key.to_string()));
        }
        let text = fs::read_to_string(&path)?;
        serde_json::from_str(&text)
            .map_err(|e| WtmError::Config(format!("{}: {e}", path.display())))
    }
}

impl FieldSink for JsonStore {
    fn save_field(&mut self, field: &Field2D, key: &str) -> Result<(), WtmError> {
        let path = Self::path_for(&self.write_dir, key);
        let text = serde_json::to_string(field)
            .map_err(|e| WtmError::Config(format!("serialize {key}: {e}")))?;
        fs::write(&path, text)?;
        Ok(())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut params: TransientParams = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => TransientParams::default(),
    };
    if let Some(n) = args.iterations {
        params.iterations = n;
    }
    if let Some(n) = args.checkpoint_interval {
        params.checkpoint_interval = n;
    }
    if let Some(t) = args.convergence_threshold {
        params.convergence_threshold = Some(t);
    }

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    let mut store = JsonStore {
        read_dir: args.data_dir.clone(),
        write_dir: args.output_dir.clone(),
    };

    info!(
        region = %params.region,
        time_start = %params.time_start,
        iterations = params.iterations,
        "initialising transient run"
    );
    let arena = FieldArena::load(&store, &params).context("loading input fields")?;
    info!(
        width = arena.width(),
        height = arena.height(),
        "fields loaded, grid shape fixed"
    );

    let mut model = TransientModel::new(params, arena).context("constructing model")?;

    let start = Instant::now();
    let summary = model.run(&mut store).context("transient run")?;
    let elapsed = start.elapsed();

    info!(
        iterations_run = summary.iterations_run,
        checkpoints = summary.checkpoints_written,
        converged = summary.converged,
        elapsed_s = elapsed.as_secs_f64(),
        "done"
    );
    println!(
        "total changes were {:.6}",
        summary.last.total_changes
    );
    println!(
        "max wtd was {:.4} and min wtd was {:.4}",
        summary.last.max_wtd, summary.last.min_wtd
    );

    Ok(())
}
