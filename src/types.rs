//! Core types and events for zine-dl

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use url::Url;

/// A downloadable issue file discovered on the archive page
///
/// Immutable value produced by the link extractor and consumed when building
/// download tasks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadLink {
    /// Section identifier, used as the download subdirectory name
    pub group_id: String,

    /// Absolute source URL
    pub url: Url,

    /// Percent-decoded basename of the URL path
    pub file_name: String,
}

/// Events emitted over the broadcast channel during a run
///
/// Multiple subscribers are supported; a subscriber that falls behind the
/// channel buffer loses the oldest events rather than blocking the run.
#[derive(Clone, Debug)]
pub enum Event {
    /// A task's action was launched
    TaskStarted {
        /// Target filename of the task
        file_name: String,
    },
    /// A task's action resolved successfully
    TaskCompleted {
        /// Target filename of the task
        file_name: String,
        /// Path the file was written to
        path: PathBuf,
    },
    /// A task's action failed; the rest of the batch continues
    TaskFailed {
        /// Target filename of the task
        file_name: String,
        /// Display form of the failure
        error: String,
    },
    /// Every enrolled task has completed; fired exactly once per run
    BatchCompleted {
        /// Number of tasks enrolled in the batch
        total: usize,
        /// Tasks whose action resolved successfully
        succeeded: usize,
        /// Tasks whose action failed
        failed: usize,
    },
    /// A notification upload failed; remaining uploads continue
    NotifyFailed {
        /// Name of the file whose upload failed
        file_name: String,
        /// Display form of the failure
        error: String,
    },
}

/// Summary of one scrape invocation
#[derive(Clone, Debug)]
pub struct RunReport {
    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Links discovered on the archive page (after extension filtering)
    pub discovered: usize,

    /// Links dropped because their destination file already existed
    pub skipped: usize,

    /// Paths of the files downloaded in this run
    pub downloaded: Vec<PathBuf>,

    /// Tasks that were scheduled but whose download failed
    pub failed: usize,

    /// Files forwarded to the notification channel
    pub notified: usize,
}
