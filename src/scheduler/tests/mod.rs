use super::*;
use crate::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn test_scheduler(cap: usize) -> (TaskScheduler, broadcast::Receiver<Event>) {
    let (event_tx, event_rx) = broadcast::channel(256);
    (TaskScheduler::new(cap, event_tx), event_rx)
}

/// Collect every event currently buffered on the receiver
fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

fn ok_task(name: &str, delay: Duration) -> DownloadTask {
    let path = PathBuf::from(format!("downloads/{name}"));
    let action_path = path.clone();
    DownloadTask::new(name, path, move || async move {
        tokio::time::sleep(delay).await;
        Ok(action_path)
    })
}

// --- concurrency cap ---

#[tokio::test]
async fn in_flight_tasks_never_exceed_the_cap() {
    let (scheduler, _rx) = test_scheduler(3);

    let in_flight = Arc::new(AtomicUsize::new(0));
    let high_water = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<DownloadTask> = (0..10)
        .map(|i| {
            let in_flight = Arc::clone(&in_flight);
            let high_water = Arc::clone(&high_water);
            let path = PathBuf::from(format!("downloads/{i}.pdf"));
            let action_path = path.clone();
            DownloadTask::new(format!("{i}.pdf"), path, move || async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                high_water.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(action_path)
            })
        })
        .collect();

    let downloaded = scheduler.run(tasks).await;

    assert_eq!(downloaded.len(), 10, "all tasks should succeed");
    let peak = high_water.load(Ordering::SeqCst);
    assert!(peak <= 3, "cap exceeded: {peak} tasks were in flight at once");
    assert!(peak >= 2, "tasks should actually overlap under a cap of 3");
}

#[tokio::test]
async fn cap_of_one_serializes_the_batch() {
    let (scheduler, _rx) = test_scheduler(1);

    let in_flight = Arc::new(AtomicUsize::new(0));
    let high_water = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<DownloadTask> = (0..5)
        .map(|i| {
            let in_flight = Arc::clone(&in_flight);
            let high_water = Arc::clone(&high_water);
            DownloadTask::new(format!("{i}.pdf"), format!("d/{i}.pdf"), move || async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                high_water.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(PathBuf::from(format!("d/{i}.pdf")))
            })
        })
        .collect();

    scheduler.run(tasks).await;

    assert_eq!(
        high_water.load(Ordering::SeqCst),
        1,
        "a cap of one must fully serialize execution"
    );
}

#[tokio::test]
async fn raising_the_cap_applies_to_the_next_run() {
    let (mut scheduler, _rx) = test_scheduler(1);
    scheduler.set_max_concurrency(5);
    assert_eq!(scheduler.max_concurrency(), 5);

    // All five tasks rendezvous on a barrier: the run can only finish if
    // five actions are admitted simultaneously, i.e. the new cap is live.
    let barrier = Arc::new(tokio::sync::Barrier::new(5));
    let tasks: Vec<DownloadTask> = (0..5)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            DownloadTask::new(format!("{i}.pdf"), format!("d/{i}.pdf"), move || async move {
                barrier.wait().await;
                Ok(PathBuf::from(format!("d/{i}.pdf")))
            })
        })
        .collect();

    let downloaded = tokio::time::timeout(Duration::from_secs(5), scheduler.run(tasks))
        .await
        .expect("run deadlocked: the raised cap was not applied");
    assert_eq!(downloaded.len(), 5);
}

#[test]
fn zero_cap_is_clamped_to_one() {
    let (event_tx, _rx) = broadcast::channel(16);
    let mut scheduler = TaskScheduler::new(0, event_tx);
    assert_eq!(scheduler.max_concurrency(), 1);
    scheduler.set_max_concurrency(0);
    assert_eq!(scheduler.max_concurrency(), 1);
}

// --- completion coverage and dispatch ---

#[tokio::test]
async fn every_action_is_invoked_exactly_once() {
    let (scheduler, _rx) = test_scheduler(2);

    let invocations: Vec<Arc<AtomicUsize>> =
        (0..8).map(|_| Arc::new(AtomicUsize::new(0))).collect();

    let tasks: Vec<DownloadTask> = invocations
        .iter()
        .enumerate()
        .map(|(i, counter)| {
            let counter = Arc::clone(counter);
            DownloadTask::new(format!("{i}.pdf"), format!("d/{i}.pdf"), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if i % 3 == 0 {
                    Err(Error::Download {
                        file_name: format!("{i}.pdf"),
                        reason: "simulated failure".into(),
                    })
                } else {
                    Ok(PathBuf::from(format!("d/{i}.pdf")))
                }
            })
        })
        .collect();

    scheduler.run(tasks).await;

    for (i, counter) in invocations.iter().enumerate() {
        assert_eq!(
            counter.load(Ordering::SeqCst),
            1,
            "task {i} was not invoked exactly once; failed tasks must not be re-dispatched"
        );
    }
}

#[tokio::test]
async fn run_resolves_only_after_the_slowest_task() {
    let (scheduler, _rx) = test_scheduler(4);

    let slow_done = Arc::new(AtomicUsize::new(0));
    let slow_flag = Arc::clone(&slow_done);

    let mut tasks = vec![DownloadTask::new("slow.pdf", "d/slow.pdf", move || {
        async move {
            tokio::time::sleep(Duration::from_millis(80)).await;
            slow_flag.store(1, Ordering::SeqCst);
            Ok(PathBuf::from("d/slow.pdf"))
        }
    })];
    for i in 0..3 {
        tasks.push(ok_task(&format!("fast-{i}.pdf"), Duration::from_millis(1)));
    }

    let downloaded = scheduler.run(tasks).await;

    assert_eq!(downloaded.len(), 4);
    assert_eq!(
        slow_done.load(Ordering::SeqCst),
        1,
        "run must not resolve before the slowest task completed"
    );
}

// --- empty batch ---

#[tokio::test]
async fn empty_batch_resolves_immediately() {
    let (scheduler, mut rx) = test_scheduler(3);

    let downloaded = tokio::time::timeout(Duration::from_millis(100), scheduler.run(Vec::new()))
        .await
        .expect("empty batch must resolve immediately");

    assert!(downloaded.is_empty());
    let completions = drain_events(&mut rx)
        .into_iter()
        .filter(|event| matches!(event, Event::BatchCompleted { total: 0, .. }))
        .count();
    assert_eq!(completions, 1, "empty batch still signals completion once");
}

// --- failure containment ---

#[tokio::test]
async fn partial_failure_returns_the_successes_and_signals_once() {
    let (scheduler, mut rx) = test_scheduler(2);

    let tasks: Vec<DownloadTask> = (0..5)
        .map(|i| {
            DownloadTask::new(format!("{i}.pdf"), format!("d/{i}.pdf"), move || async move {
                if i == 2 {
                    Err(Error::Download {
                        file_name: format!("{i}.pdf"),
                        reason: "connection reset".into(),
                    })
                } else {
                    Ok(PathBuf::from(format!("d/{i}.pdf")))
                }
            })
        })
        .collect();

    let downloaded = scheduler.run(tasks).await;

    assert_eq!(downloaded.len(), 4, "the four healthy tasks must succeed");
    assert!(
        !downloaded.contains(&PathBuf::from("d/2.pdf")),
        "the failed task must not appear in the result"
    );

    let events = drain_events(&mut rx);
    let completions: Vec<&Event> = events
        .iter()
        .filter(|event| matches!(event, Event::BatchCompleted { .. }))
        .collect();
    assert_eq!(completions.len(), 1, "completion must be signalled exactly once");
    match completions[0] {
        Event::BatchCompleted {
            total,
            succeeded,
            failed,
        } => {
            assert_eq!((*total, *succeeded, *failed), (5, 4, 1));
        }
        _ => unreachable!(),
    }

    let failures = events
        .iter()
        .filter(|event| matches!(event, Event::TaskFailed { .. }))
        .count();
    assert_eq!(failures, 1);
}

#[tokio::test]
async fn panicking_action_counts_as_failed_and_does_not_abort_siblings() {
    let (scheduler, mut rx) = test_scheduler(2);

    let tasks = vec![
        DownloadTask::new("boom.pdf", "d/boom.pdf", || async {
            panic!("simulated panic in action")
        }),
        ok_task("ok.pdf", Duration::from_millis(1)),
    ];

    let downloaded = scheduler.run(tasks).await;

    assert_eq!(downloaded, vec![PathBuf::from("downloads/ok.pdf")]);
    let events = drain_events(&mut rx);
    assert!(
        events.iter().any(|event| matches!(
            event,
            Event::BatchCompleted {
                total: 2,
                succeeded: 1,
                failed: 1
            }
        )),
        "batch completion must account for the panicked task"
    );
}

// --- task accessors ---

#[test]
fn task_exposes_identity_and_destination() {
    let task = DownloadTask::new("issue.pdf", "downloads/2024-05/issue.pdf", || async {
        Ok(PathBuf::from("downloads/2024-05/issue.pdf"))
    });
    assert_eq!(task.file_name(), "issue.pdf");
    assert_eq!(
        task.dest_path(),
        Path::new("downloads/2024-05/issue.pdf")
    );
    let debug = format!("{task:?}");
    assert!(debug.contains("issue.pdf"), "Debug should name the file");
}
