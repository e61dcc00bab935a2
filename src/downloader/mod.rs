//! Scrape-run orchestration
//!
//! [`ZineDownloader`] wires the leaf collaborators together: one login per
//! run, link discovery on the archive page, the existence filter, the
//! bounded task scheduler, and the optional notifier. Each [`scrape`]
//! invocation builds its state from scratch; nothing is carried over
//! between runs.
//!
//! [`scrape`]: ZineDownloader::scrape

mod fetch;


use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::error::Result;
use crate::extract;
use crate::notify::{NoOpNotifier, Notifier, SlackNotifier};
use crate::scheduler::{DownloadTask, TaskScheduler};
use crate::session::Session;
use crate::types::{DownloadLink, Event, RunReport};

/// Event channel capacity; a subscriber lagging behind this many events
/// loses the oldest ones
const EVENT_BUFFER: usize = 1000;

/// Main downloader instance
///
/// Construct once from a [`Config`]; every [`scrape`](Self::scrape) call is
/// an independent run.
pub struct ZineDownloader {
    config: Arc<Config>,
    event_tx: broadcast::Sender<Event>,
    scheduler: TaskScheduler,
    notifier: Box<dyn Notifier>,
}

impl ZineDownloader {
    /// Create a downloader from configuration.
    ///
    /// The notifier is chosen here: Slack when configured, a no-op
    /// otherwise.
    pub fn new(config: Config) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_BUFFER);
        let scheduler = TaskScheduler::new(
            config.download.max_concurrent_downloads,
            event_tx.clone(),
        );
        let notifier: Box<dyn Notifier> = match &config.slack {
            Some(slack) => Box::new(SlackNotifier::new(slack.clone(), event_tx.clone())),
            None => Box::new(NoOpNotifier),
        };

        Self {
            config: Arc::new(config),
            event_tx,
            scheduler,
            notifier,
        }
    }

    /// Subscribe to run events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently. Events are buffered, and a subscriber that falls too
    /// far behind receives a `RecvError::Lagged` instead of blocking the run.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The configuration this downloader was built from
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one full scrape: login, discover links, filter out files already
    /// present, download the rest under the concurrency cap, then notify.
    ///
    /// Authentication and extraction failures abort the run before any task
    /// is scheduled. Individual download failures are contained by the
    /// scheduler and only show up in the report counts. A notification
    /// failure is logged and never fails the run.
    pub async fn scrape(&self) -> Result<RunReport> {
        let started_at = chrono::Utc::now();
        let site = &self.config.site;

        let session = Session::login(site).await?;
        let body = session.protected_page(&site.archive_path).await?;
        let links = extract::extract_links(&body, session.base_url())?;
        let discovered = links.len();
        tracing::info!(links = discovered, "discovered download links");

        let (tasks, skipped) = self.plan_tasks(&session, links);
        let scheduled = tasks.len();
        let downloaded = self.scheduler.run(tasks).await;
        let failed = scheduled - downloaded.len();

        let notified = match self.notifier.notify(&downloaded).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "notification failed");
                0
            }
        };

        Ok(RunReport {
            started_at,
            discovered,
            skipped,
            downloaded,
            failed,
            notified,
        })
    }

    /// Existence filter and task construction.
    ///
    /// Destination layout is `<download_dir>/<group-id>/<file-name>`. With
    /// `skip_existing` set, a link whose destination already exists never
    /// becomes a task; its action is never built, let alone invoked. The
    /// probe is advisory; a racing write between check and download is
    /// accepted.
    fn plan_tasks(&self, session: &Session, links: Vec<DownloadLink>) -> (Vec<DownloadTask>, usize) {
        let download = &self.config.download;
        let mut tasks = Vec::with_capacity(links.len());
        let mut skipped = 0usize;

        for link in links {
            let dest_path = download
                .download_dir
                .join(&link.group_id)
                .join(&link.file_name);

            if download.skip_existing && dest_path.exists() {
                tracing::debug!(file = %dest_path.display(), "already present, skipping");
                skipped += 1;
                continue;
            }

            let client = session.client().clone();
            let url = link.url;
            let action_dest = dest_path.clone();
            tasks.push(DownloadTask::new(link.file_name, dest_path, move || {
                fetch::fetch_file(client, url, action_dest)
            }));
        }

        (tasks, skipped)
    }
}
