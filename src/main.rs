use anyhow::{Context, Result};
use clap::Parser;
use sparkify_etl::config::{AppConfig, CliConfig, FileConfig};
use sparkify_etl::{run_pipeline, LoggingObserver, SqliteWarehouse};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "sparkify-etl")]
#[command(about = "Load song catalog and activity log files into the warehouse database")]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override flags.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite warehouse database file [default: sparkify.db].
    #[clap(long)]
    pub db_path: Option<PathBuf>,

    /// Root directory of the song catalog files [default: data/song_data].
    #[clap(long)]
    pub song_data: Option<PathBuf>,

    /// Root directory of the activity log files [default: data/log_data].
    #[clap(long)]
    pub log_data: Option<PathBuf>,

    /// How long to wait on a locked database, in milliseconds.
    #[clap(long)]
    pub busy_timeout_ms: Option<u64>,

    /// Drop and recreate all warehouse tables before loading.
    #[clap(long, default_value_t = false)]
    pub reset: bool,

    /// Stop at the first record that cannot be loaded.
    #[clap(long, default_value_t = false)]
    pub stop_on_error: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            song_data: self.song_data.clone(),
            log_data: self.log_data.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            stop_on_error: self.stop_on_error,
            reset: self.reset,
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let mut warehouse = SqliteWarehouse::open(&config.db_path, config.busy_timeout)?;
    if config.reset {
        warehouse.reset()?;
    }

    let report = run_pipeline(
        &mut warehouse,
        &config.sources,
        &config.ingest,
        &mut LoggingObserver,
    )?;

    let counts = warehouse.counts()?;
    info!("");
    info!("Ingestion Summary");
    info!("=================");
    info!(
        "Song files: {}/{} committed, log files: {}/{} committed",
        report.songs.files_committed,
        report.songs.files_found,
        report.logs.files_committed,
        report.logs.files_found
    );
    info!(
        "Song plays resolved to a catalog song: {}",
        report.logs.resolved
    );
    if report.failure_count() > 0 {
        warn!("Records skipped: {}", report.failure_count());
    }
    info!("");
    info!("Database contains:");
    info!("  {} songs", counts.songs);
    info!("  {} artists", counts.artists);
    info!("  {} users", counts.users);
    info!("  {} time rows", counts.time);
    info!("  {} songplays", counts.songplays);

    Ok(())
}
