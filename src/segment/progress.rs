//! Progress aggregation for segmented downloads.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// How often aggregated progress is pushed to the sink
pub(crate) const PROGRESS_UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// Receiver for aggregated download progress.
///
/// Implementations get the resource's total size and the bytes present
/// on disk across all segments; what they do with the numbers (render a
/// bar, push a metric, nothing) is up to them.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Called with the total size in bytes and the bytes fetched so far.
    async fn report(&self, total: u64, completed: u64);
}

/// Sink that discards all progress reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpProgress;

#[async_trait]
impl ProgressSink for NoOpProgress {
    async fn report(&self, _total: u64, _completed: u64) {}
}

/// Parameters for the progress reporter task.
pub(crate) struct ProgressReporterParams {
    /// Total size of the resource in bytes
    pub(crate) total_size: u64,
    /// Per-segment byte counters written by the segment workers
    pub(crate) counters: Vec<Arc<AtomicU64>>,
    /// Where aggregated progress goes
    pub(crate) sink: Arc<dyn ProgressSink>,
    /// Stops the reporter once the segments are done
    pub(crate) cancel_token: CancellationToken,
}

/// Spawn a background task that periodically reports download progress.
///
/// The reporter polls the segment counters on a fixed interval and
/// pushes their sum to the sink. On cancellation it emits one final
/// report before exiting, so the sink always sees the last aggregate.
pub(crate) fn spawn_progress_reporter(
    params: ProgressReporterParams,
) -> tokio::task::JoinHandle<()> {
    let ProgressReporterParams {
        total_size,
        counters,
        sink,
        cancel_token,
    } = params;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PROGRESS_UPDATE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let completed: u64 =
                        counters.iter().map(|c| c.load(Ordering::Relaxed)).sum();
                    sink.report(total_size, completed).await;
                }
                _ = cancel_token.cancelled() => {
                    let completed: u64 =
                        counters.iter().map(|c| c.load(Ordering::Relaxed)).sum();
                    sink.report(total_size, completed).await;
                    break;
                }
            }
        }
    })
}
