//! Signal trading bot - Entry Point
//!
//! Parses a block of signals, schedules them and prints the session report.

use anyhow::{bail, Result};
use clap::Parser;
use sigtrade_bot::{AppConfig, Application};
use sigtrade_feed::SignalParser;
use sigtrade_scheduler::SessionOutcome;
use sigtrade_telemetry::Metrics;
use std::io::Read;
use std::path::PathBuf;
use tracing::info;

/// Signal trading bot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SIGTRADE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Signal file, one `HH:MM;PAIR;DIRECTION;EXPIRY` per line
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Signal text block; read from stdin when neither this nor --file is given
    #[arg(short, long)]
    text: Option<String>,

    /// Only parse and print the signals
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    sigtrade_ws::init_crypto();

    let args = Args::parse();

    sigtrade_telemetry::init_logging()?;

    info!("Starting sigtrade bot v{}", env!("CARGO_PKG_VERSION"));

    let parser = SignalParser::new();
    let signals = match (&args.file, &args.text) {
        (Some(path), _) => parser.parse_file(path)?,
        (None, Some(text)) => parser.parse_text(text),
        (None, None) => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            parser.parse_text(&text)
        }
    };
    let stats = parser.stats();
    Metrics::signals_parsed(stats.accepted(), stats.rejected());
    info!(
        accepted = stats.accepted(),
        rejected = stats.rejected(),
        "Signals parsed"
    );

    if args.check {
        for signal in &signals {
            println!("{}", signal.to_line());
        }
        if signals.is_empty() {
            bail!("no valid signals found");
        }
        return Ok(());
    }

    // Determine config path: CLI arg > SIGTRADE_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("SIGTRADE_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = AppConfig::load(&config_path)?;
    info!(mode = ?config.account.mode, assets = config.assets.len(), "Configuration loaded");

    let app = Application::new(config)?;
    match app.run(signals).await? {
        SessionOutcome::NoSignals => println!("No valid signals found to process."),
        SessionOutcome::Completed(report) => println!("{report}"),
    }

    Ok(())
}
