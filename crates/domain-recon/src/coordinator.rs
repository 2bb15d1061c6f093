//! Run coordination: partitioning, worker dispatch, completion barrier.

use crate::config::Config;
use crate::error::Result;
use crate::partition::partition;
use crate::report::{result_file_name, CsvSink};
use crate::store::StoreConnector;
use crate::worker::ReconWorker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Completion barrier for in-flight workers.
///
/// The counter is incremented before each worker is dispatched and
/// decremented by the guard's drop when the worker finishes, normally
/// or not. The final decrement wakes [`WaitGroup::wait`]. State lives
/// only for one run; nothing survives past it.
pub struct WaitGroup {
    inner: Arc<WaitGroupInner>,
}

struct WaitGroupInner {
    in_flight: Mutex<usize>,
    notify: Notify,
}

/// Decrements the wait group exactly once, on drop.
///
/// Spawned worker tasks hold the guard for their whole body, so the
/// barrier is signaled on every exit path, panics included.
pub struct WorkerGuard {
    inner: Arc<WaitGroupInner>,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(WaitGroupInner {
                in_flight: Mutex::new(0),
                notify: Notify::new(),
            }),
        }
    }

    /// Register one in-flight worker. Call before dispatching it.
    pub fn add(&self) -> WorkerGuard {
        let mut count = self.inner.in_flight.lock().unwrap();
        *count += 1;
        WorkerGuard {
            inner: self.inner.clone(),
        }
    }

    /// Block until every registered worker has signaled.
    pub async fn wait(&self) {
        loop {
            // Register for notification before checking the count, so a
            // decrement between check and await cannot be missed.
            let notified = self.inner.notify.notified();
            if *self.inner.in_flight.lock().unwrap() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let mut count = self.inner.in_flight.lock().unwrap();
        *count -= 1;
        if *count == 0 {
            self.inner.notify.notify_waiters();
        }
    }
}

/// Final status of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every dispatched worker finished successfully.
    Completed,

    /// At least one worker aborted its range.
    Failed,

    /// The wait was interrupted; some records may be untested.
    Interrupted,
}

/// Result of a reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: RunStatus,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Rows the target table reported at run start.
    pub rows_total: u64,

    /// Ranges dispatched to workers.
    pub ranges_total: usize,

    /// Ranges whose worker aborted. Which ranges failed is visible
    /// only in the per-worker diagnostics, not here.
    pub ranges_failed: usize,

    /// Rows actually compared.
    pub rows_tested: u64,

    /// Result rows written across all workers.
    pub discrepancies: u64,
}

impl RunSummary {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Computes the partition, spawns one worker per range, and blocks on
/// the completion barrier.
pub struct Coordinator {
    config: Config,
    connector: Arc<dyn StoreConnector>,
}

impl Coordinator {
    pub fn new(config: Config, connector: Arc<dyn StoreConnector>) -> Self {
        Self { config, connector }
    }

    /// Run one reconciliation pass.
    ///
    /// Returns an error only for failures before dispatch (count query,
    /// store probe). Worker failures downgrade the summary status
    /// instead; diagnostics for each failed range go to the log.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunSummary> {
        // Catch invalid settings injected after Config::load, such as
        // a zero worker-count override.
        self.config.validate()?;

        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting reconciliation run: {}", run_id);

        // Fail fast if the workload size cannot be determined.
        let total = self.connector.count_target_rows().await?;
        info!("Testing {} records", total);

        let workers = self.config.recon.get_workers();
        let ranges = partition(total, workers);
        if ranges.is_empty() {
            info!("No test records found in target table");
            return Ok(self.summary(run_id, RunStatus::Completed, started_at, total, 0, &Counters::default()));
        }

        info!("Dispatching {} workers for {} rows", ranges.len(), total);

        // File stamp shared by all of this run's result files.
        let stamp = started_at.format("%Y%m%d%H%M%S").to_string();
        let output_dir = self.config.recon.get_output_dir();
        let page_size = self.config.recon.get_page_size();

        let wait_group = WaitGroup::new();
        let counters = Counters::default();

        for range in &ranges {
            let range = *range;
            let path = output_dir.join(result_file_name(&stamp, range));
            let sink = Box::new(CsvSink::new(&path));
            let worker = ReconWorker::new(range, page_size, self.connector.clone(), sink);

            // Incremented before dispatch; the guard's drop decrements
            // on every exit path of the spawned task.
            let guard = wait_group.add();
            let counters = counters.clone();

            tokio::spawn(async move {
                let _guard = guard;
                match worker.execute().await {
                    Ok(stats) => {
                        counters.rows_tested.fetch_add(stats.rows_tested, Ordering::Relaxed);
                        counters
                            .discrepancies
                            .fetch_add(stats.discrepancies, Ordering::Relaxed);
                    }
                    Err(e) => {
                        error!("Range {} aborted: {}", range, e.format_detailed());
                        counters.ranges_failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }

        // Interruption terminates the wait; it is never retried. The
        // already-running workers keep going until their own completion.
        tokio::select! {
            _ = wait_group.wait() => {}
            _ = cancel.cancelled() => {
                warn!("Run interrupted - some records may not have been tested");
                return Ok(self.summary(
                    run_id,
                    RunStatus::Interrupted,
                    started_at,
                    total,
                    ranges.len(),
                    &counters,
                ));
            }
        }

        let status = if counters.ranges_failed.load(Ordering::Relaxed) > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        let summary = self.summary(run_id, status, started_at, total, ranges.len(), &counters);
        info!(
            "Run {:?}: {} rows tested, {} discrepancies, {}/{} ranges failed in {:.1}s",
            summary.status,
            summary.rows_tested,
            summary.discrepancies,
            summary.ranges_failed,
            summary.ranges_total,
            summary.duration_seconds
        );
        Ok(summary)
    }

    fn summary(
        &self,
        run_id: String,
        status: RunStatus,
        started_at: DateTime<Utc>,
        rows_total: u64,
        ranges_total: usize,
        counters: &Counters,
    ) -> RunSummary {
        let completed_at = Utc::now();
        RunSummary {
            run_id,
            status,
            started_at,
            completed_at,
            duration_seconds: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
            rows_total,
            ranges_total,
            ranges_failed: counters.ranges_failed.load(Ordering::Relaxed),
            rows_tested: counters.rows_tested.load(Ordering::Relaxed),
            discrepancies: counters.discrepancies.load(Ordering::Relaxed),
        }
    }
}

/// Aggregation counters shared with worker tasks for one run.
#[derive(Clone, Default)]
struct Counters {
    ranges_failed: Arc<AtomicUsize>,
    rows_tested: Arc<AtomicU64>,
    discrepancies: Arc<AtomicU64>,
}
