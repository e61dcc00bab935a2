//! zine-dl CLI: run one scrape against the configured site.
//!
//! Credentials and the optional Slack pair come from the environment (a
//! `.env` file is honoured); the only argument is an optional destination
//! directory.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use zine_dl::{Config, ZineDownloader};

/// Download new magazine issues into a local directory tree
#[derive(Debug, Parser)]
#[command(name = "zine-dl", version, about)]
struct Cli {
    /// Destination directory for downloaded issues
    #[arg(value_name = "DIR")]
    destination: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            // An operator mistake, not a crash: plain message, no stack trace
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    if let Some(destination) = cli.destination {
        config.download.download_dir = destination;
    }

    let downloader = ZineDownloader::new(config);
    match downloader.scrape().await {
        Ok(report) => {
            tracing::info!(
                discovered = report.discovered,
                skipped = report.skipped,
                downloaded = report.downloaded.len(),
                failed = report.failed,
                notified = report.notified,
                "run complete"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "run failed");
        }
    }
}
