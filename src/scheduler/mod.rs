//! Bounded-concurrency download task scheduling
//!
//! The scheduler executes a batch of independent asynchronous download
//! actions with a fixed parallelism cap and resolves once the entire batch
//! has finished. Admission is the semaphore pattern: the enrollment loop
//! acquires an owned permit before spawning each task, and a finishing task
//! dropping its permit is what admits the next one. The permit acquisition
//! is the atomic cap-check-and-admit step, so no bookkeeping can be read
//! stale and no task can be admitted beyond the cap.
//!
//! All run state (semaphore, counters, join handles) is constructed fresh
//! inside every [`TaskScheduler::run`] call. Two overlapping runs cannot
//! interfere with each other's bookkeeping.
//!
//! # Example
//!
//! ```no_run
//! use zine_dl::scheduler::{DownloadTask, TaskScheduler};
//! use tokio::sync::broadcast;
//!
//! # async fn example() {
//! let (event_tx, _rx) = broadcast::channel(16);
//! let scheduler = TaskScheduler::new(3, event_tx);
//!
//! let tasks = vec![DownloadTask::new(
//!     "issue-2024-05.pdf",
//!     "downloads/2024-05/issue-2024-05.pdf",
//!     || async { Ok("downloads/2024-05/issue-2024-05.pdf".into()) },
//! )];
//!
//! let downloaded = scheduler.run(tasks).await;
//! assert_eq!(downloaded.len(), 1);
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;
use tokio::sync::{Semaphore, broadcast};

use crate::error::Result;
use crate::types::Event;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

/// Default number of downloads allowed in flight at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Zero-argument asynchronous action performing one fetch-and-write
type TaskAction = Box<dyn FnOnce() -> BoxFuture<'static, Result<PathBuf>> + Send>;

/// One unit of work: a single file download
///
/// Identity is the target filename (unique within a run). The task owns its
/// action; [`TaskScheduler::run`] moves the task into exactly one spawned
/// future, so the action cannot be invoked twice.
pub struct DownloadTask {
    file_name: String,
    dest_path: PathBuf,
    action: TaskAction,
}

impl DownloadTask {
    /// Create a task from its identity and its asynchronous action.
    ///
    /// The action is only invoked once the scheduler admits the task under
    /// the concurrency cap; on success it resolves with the path it wrote.
    pub fn new<F, Fut>(
        file_name: impl Into<String>,
        dest_path: impl Into<PathBuf>,
        action: F,
    ) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<PathBuf>> + Send + 'static,
    {
        Self {
            file_name: file_name.into(),
            dest_path: dest_path.into(),
            action: Box::new(move || Box::pin(action())),
        }
    }

    /// Target filename (unique within a run)
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Destination path the action writes to
    pub fn dest_path(&self) -> &Path {
        &self.dest_path
    }
}

impl std::fmt::Debug for DownloadTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadTask")
            .field("file_name", &self.file_name)
            .field("dest_path", &self.dest_path)
            .finish_non_exhaustive()
    }
}

/// Executes batches of download tasks under a concurrency cap
///
/// The cap applies per run; [`set_max_concurrency`](Self::set_max_concurrency)
/// takes effect for the next [`run`](Self::run) call.
pub struct TaskScheduler {
    max_concurrency: usize,
    event_tx: broadcast::Sender<Event>,
}

impl TaskScheduler {
    /// Create a scheduler with the given concurrency cap (clamped to ≥ 1)
    pub fn new(max_concurrency: usize, event_tx: broadcast::Sender<Event>) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            event_tx,
        }
    }

    /// Set the concurrency cap for subsequent runs (clamped to ≥ 1)
    pub fn set_max_concurrency(&mut self, max_concurrency: usize) {
        self.max_concurrency = max_concurrency.max(1);
    }

    /// The currently configured concurrency cap
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run a batch of tasks to completion.
    ///
    /// Dispatches tasks in enrollment order, never exceeding the concurrency
    /// cap, and resolves only after every enrolled task has completed,
    /// whether it succeeded or failed. The returned paths belong to the
    /// tasks whose action resolved without error; their order follows
    /// enrollment order of the successes, which is not part of the contract.
    ///
    /// An empty batch resolves immediately with an empty result. A failing
    /// action is logged, emitted as [`Event::TaskFailed`] and counted toward
    /// completion; it neither aborts sibling tasks nor appears in the
    /// result. After the last task completes, [`Event::BatchCompleted`] is
    /// emitted exactly once, and the future resolving is the single
    /// batch-completion signal.
    pub async fn run(&self, tasks: Vec<DownloadTask>) -> Vec<PathBuf> {
        let total = tasks.len();
        if total == 0 {
            self.emit(Event::BatchCompleted {
                total: 0,
                succeeded: 0,
                failed: 0,
            });
            return Vec::new();
        }

        tracing::info!(
            tasks = total,
            max_concurrency = self.max_concurrency,
            "starting download batch"
        );

        // Per-run state. The permit count is read once here, so a cap change
        // during a run only affects the next run.
        let limit = Arc::new(Semaphore::new(self.max_concurrency));
        let completed = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::with_capacity(total);

        for task in tasks {
            let permit = match limit.clone().acquire_owned().await {
                Ok(permit) => permit,
                // The semaphore is never closed; nothing to admit if it were
                Err(_) => break,
            };

            let completed = Arc::clone(&completed);
            let event_tx = self.event_tx.clone();
            handles.push(tokio::spawn(async move {
                // Held for the task's whole lifetime; dropping it on
                // completion admits the next enrolled task
                let _permit = permit;

                let DownloadTask {
                    file_name, action, ..
                } = task;
                event_tx
                    .send(Event::TaskStarted {
                        file_name: file_name.clone(),
                    })
                    .ok();

                let outcome = action().await;
                completed.fetch_add(1, Ordering::SeqCst);

                match outcome {
                    Ok(path) => {
                        tracing::info!(file = %path.display(), "downloaded");
                        event_tx
                            .send(Event::TaskCompleted {
                                file_name,
                                path: path.clone(),
                            })
                            .ok();
                        Some(path)
                    }
                    Err(e) => {
                        tracing::warn!(file = %file_name, error = %e, "download task failed");
                        event_tx
                            .send(Event::TaskFailed {
                                file_name,
                                error: e.to_string(),
                            })
                            .ok();
                        None
                    }
                }
            }));
        }

        // The batch resolves only once every spawned task has finished
        let mut succeeded = Vec::new();
        let mut failed = 0usize;
        for handle in handles {
            match handle.await {
                Ok(Some(path)) => succeeded.push(path),
                Ok(None) => failed += 1,
                Err(e) => {
                    // A panicked action counts as completed-without-success
                    completed.fetch_add(1, Ordering::SeqCst);
                    failed += 1;
                    tracing::error!(error = %e, "download task panicked");
                }
            }
        }

        tracing::info!(
            total,
            succeeded = succeeded.len(),
            failed,
            "download batch complete"
        );
        self.emit(Event::BatchCompleted {
            total,
            succeeded: succeeded.len(),
            failed,
        });
        succeeded
    }

    fn emit(&self, event: Event) {
        // send() only errs when no subscriber is listening, which is fine
        self.event_tx.send(event).ok();
    }
}
