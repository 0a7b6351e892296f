//! VidBridge CLI - Headless driver for the playback core
//!
//! Features:
//! - Simulated playback sessions with live host events
//! - Scripted seeks and stops
//! - Effective configuration dump
//! - Host event catalogue

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vidbridge_core::PlayerConfig;

mod commands;
mod output;

/// VidBridge CLI - Playback core toolkit
#[derive(Parser)]
#[command(name = "vidbridge")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Drive the VidBridge playback core without a device", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Player configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the progress tick period
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Override the end-of-stream threshold
    #[arg(long)]
    end_threshold: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a media URL on the simulated engine and print host events
    Simulate {
        /// Media URL
        url: String,

        /// Simulated media duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: f64,

        /// Restart from zero at end of stream
        #[arg(short, long)]
        r#loop: bool,

        /// Wait in paused state instead of playing when ready
        #[arg(long)]
        no_autoplay: bool,

        /// Start muted
        #[arg(long)]
        silent: bool,

        /// Seek to this fraction of the duration
        #[arg(long)]
        seek: Option<f64>,

        /// Seconds after load before seeking
        #[arg(long, default_value = "2")]
        seek_at: f64,

        /// Seconds after load before stopping
        #[arg(long)]
        stop_at: Option<f64>,

        /// Give up after this many seconds (default: duration + 5)
        #[arg(long)]
        timeout: Option<f64>,
    },

    /// Show the effective player configuration
    Config,

    /// List host events and status codes
    Events,
}

fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so event output on stdout stays machine-readable
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<PlayerConfig> {
    let mut config = match &cli.config {
        Some(path) => PlayerConfig::from_json_file(path)?,
        None => PlayerConfig::default(),
    };

    if let Some(interval) = cli.interval_ms {
        config.progress_interval_ms = interval;
    }
    if let Some(threshold) = cli.end_threshold {
        config.end_threshold = threshold;
    }
    config.validate()?;

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json_logs);
    vidbridge_core::init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Simulate {
            url,
            duration,
            r#loop,
            no_autoplay,
            silent,
            seek,
            seek_at,
            stop_at,
            timeout,
        } => {
            let script = commands::SimulateScript {
                url,
                duration,
                looping: r#loop,
                autoplay: !no_autoplay,
                silent,
                seek: seek.map(|fraction| (fraction, seek_at)),
                stop_at,
                timeout: timeout.unwrap_or(duration + 5.0),
            };
            commands::simulate(script, config, &cli.format).await?;
        }
        Commands::Config => {
            commands::show_config(&config, &cli.format)?;
        }
        Commands::Events => {
            commands::list_events(&cli.format)?;
        }
    }

    Ok(())
}
