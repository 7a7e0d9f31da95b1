//! CLI for memqueue
//!
//! Subcommands:
//! - `run`: wire the configured topology, run producers to completion and
//!   drain every consumer
//! - `config`: print the resolved settings as JSON

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use memqueue::broker::{Broker, BrokerStats, ShutdownMode, ShutdownReport};
use memqueue::client::StdoutSink;
use memqueue::config::{Settings, load_config, load_config_from};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "memqueue")]
enum Command {
    /// Run the configured topology until every queued message is delivered
    Run {
        /// Configuration file (default: config/default.* if present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print broker stats and the shutdown report as JSON on exit
        #[arg(long)]
        summary: bool,
        /// Log level: error, warn, info, debug or trace
        #[arg(long, default_value = "info")]
        log_level: String,
    },
    /// Print the resolved configuration
    Config {
        /// Configuration file (default: config/default.* if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cmd = Command::parse();

    match cmd {
        Command::Run {
            config,
            summary,
            log_level,
        } => {
            memqueue::utils::logging::init(&log_level);
            if let Err(e) = run(config.as_deref(), summary).await {
                error!("Run failed: {}", e);
                std::process::exit(1);
            }
        }
        Command::Config { config } => {
            memqueue::utils::logging::init("warn");
            if let Err(e) = show_config(config.as_deref()) {
                error!("Could not load configuration: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings, Box<dyn std::error::Error>> {
    let settings = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(settings)
}

async fn run(path: Option<&Path>, summary: bool) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings(path)?;
    let broker = Broker::from_settings(&settings, Arc::new(StdoutSink))?;
    let (stats, report) = supervise(broker, tokio::signal::ctrl_c()).await?;

    if report.total_undelivered() > 0 {
        warn!(
            undelivered = report.total_undelivered(),
            "some messages were never delivered"
        );
    }
    if summary {
        let out = serde_json::json!({ "stats": stats, "shutdown": report });
        println!("{}", serde_json::to_string_pretty(&out)?);
    }
    Ok(())
}

/// Drain `broker` off the async runtime; if `signal` fires first, switch to
/// an immediate shutdown and wait for the workers to stop.
async fn supervise(
    mut broker: Broker,
    signal: impl Future<Output = std::io::Result<()>>,
) -> Result<(BrokerStats, ShutdownReport), Box<dyn std::error::Error>> {
    let shutdown = broker.shutdown_handle();
    let mut drain = tokio::task::spawn_blocking(move || {
        let report = broker.shutdown(ShutdownMode::Drain);
        (broker.stats(), report)
    });

    let outcome = tokio::select! {
        result = &mut drain => result?,
        _ = signal => {
            info!("Shutdown signal received. Stopping workers.");
            shutdown.trigger(ShutdownMode::Immediate);
            drain.await?
        }
    };
    Ok(outcome)
}

fn render_config(path: Option<&Path>) -> Result<String, Box<dyn std::error::Error>> {
    let settings = load_settings(path)?;
    settings.validate()?;
    Ok(serde_json::to_string_pretty(&settings)?)
}

fn show_config(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(path)?);
    Ok(())
}
