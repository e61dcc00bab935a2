//! # zine-dl
//!
//! Magazine issue download manager: authenticates against a distribution
//! site, discovers downloadable issue files per section, downloads the ones
//! missing locally under a bounded concurrency cap, and optionally forwards
//! newly downloaded files to Slack.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - the CLI binary is a thin shell over [`ZineDownloader`]
//! - **Per-run state** - every scrape builds its scheduler state from
//!   scratch; runs cannot interfere with each other
//! - **Contained failures** - a single failed download or upload never
//!   aborts its siblings; only authentication and extraction problems abort
//!   a run
//! - **Event-driven** - consumers subscribe to run events, no polling
//!   required
//!
//! ## Quick Start
//!
//! ```no_run
//! use zine_dl::{Config, ZineDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let downloader = ZineDownloader::new(config);
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = downloader.scrape().await?;
//!     println!("downloaded {} new files", report.downloaded.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Scrape-run orchestration
pub mod downloader;
/// Error types
pub mod error;
/// Archive page link extraction
pub mod extract;
/// Notification of downloaded files
pub mod notify;
/// Bounded-concurrency download task scheduling
pub mod scheduler;
/// Authenticated session handling
pub mod session;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, SiteConfig, SlackConfig};
pub use downloader::ZineDownloader;
pub use error::{Error, Result};
pub use notify::{NoOpNotifier, Notifier, SlackNotifier};
pub use scheduler::{DEFAULT_MAX_CONCURRENCY, DownloadTask, TaskScheduler};
pub use session::Session;
pub use types::{DownloadLink, Event, RunReport};
