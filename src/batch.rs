//! Concurrent batch fetching on a fixed worker pool.
//!
//! A batch run seeds a shared task queue with every request followed by
//! one shutdown sentinel per worker. Workers pull tasks until they see a
//! sentinel, forward it to the output queue, and terminate; the stream
//! ends once it has seen one forwarded sentinel per worker, so a record
//! still in flight on one worker cannot be cut off by another worker
//! finishing first. The output queue is bounded, so a slow consumer
//! backpressures the pool instead of buffering every response in
//! memory.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

use crate::client::FetchClient;
use crate::types::{RequestSpec, ResponseRecord};

/// Fans a list of requests out over a fixed number of workers.
pub struct BatchFetcher {
    client: Arc<FetchClient>,
    worker_count: usize,
}

impl BatchFetcher {
    /// Create a batch fetcher that runs `worker_count` workers per run.
    ///
    /// A zero worker count is clamped to one so a run always makes
    /// progress.
    pub fn new(client: Arc<FetchClient>, worker_count: usize) -> Self {
        Self {
            client,
            worker_count: worker_count.max(1),
        }
    }

    /// Fetch every task concurrently, yielding records as they complete.
    ///
    /// Records arrive in completion order, not submission order, and
    /// each task is delivered to exactly one worker. Tasks whose fetch
    /// raises an error are logged and skipped; transport failures still
    /// produce a record, flagged inside [`ResponseRecord::error`].
    ///
    /// The pool starts working immediately. Consumption is lazy: the
    /// workers run ahead of the consumer by at most the capacity of the
    /// bounded output queue, and dropping the stream stops the pool.
    pub fn run(&self, tasks: Vec<RequestSpec>) -> RecordStream {
        let worker_count = self.worker_count;
        let (task_tx, task_rx) =
            mpsc::channel::<Option<RequestSpec>>(tasks.len().max(1) + worker_count);
        let (record_tx, record_rx) = mpsc::channel::<Option<ResponseRecord>>(worker_count);

        debug!(tasks = tasks.len(), workers = worker_count, "starting batch run");

        // Seed the queue with every task, then one sentinel per worker.
        // The queue has room for all of it, so the seeder never blocks.
        tokio::spawn(async move {
            for task in tasks {
                if task_tx.send(Some(task)).await.is_err() {
                    return;
                }
            }
            for _ in 0..worker_count {
                if task_tx.send(None).await.is_err() {
                    return;
                }
            }
        });

        let task_rx = Arc::new(Mutex::new(task_rx));
        for worker_id in 0..worker_count {
            let client = Arc::clone(&self.client);
            let tasks = Arc::clone(&task_rx);
            let output = record_tx.clone();
            tokio::spawn(run_worker(worker_id, client, tasks, output));
        }

        RecordStream::new(record_rx, worker_count)
    }
}

/// Pull tasks from the shared queue until a sentinel appears.
///
/// Each worker consumes exactly one sentinel and forwards exactly one to
/// the output before terminating. With one sentinel per worker seeded
/// behind the tasks, every task is claimed before any worker shuts
/// down, and exactly `worker_count` sentinels reach the output queue.
async fn run_worker(
    worker_id: usize,
    client: Arc<FetchClient>,
    tasks: Arc<Mutex<mpsc::Receiver<Option<RequestSpec>>>>,
    output: mpsc::Sender<Option<ResponseRecord>>,
) {
    loop {
        let task = tasks.lock().await.recv().await;
        match task {
            Some(Some(spec)) => match client.send(&spec).await {
                Ok(record) => {
                    if output.send(Some(record)).await.is_err() {
                        // The consumer dropped the stream; nothing left to do
                        return;
                    }
                }
                Err(e) => {
                    warn!(
                        worker = worker_id,
                        url = %spec.url(),
                        error = %e,
                        "fetch failed, skipping task"
                    );
                }
            },
            Some(None) | None => {
                debug!(worker = worker_id, "sentinel received, worker finished");
                let _ = output.send(None).await;
                return;
            }
        }
    }
}

/// Stream of completed fetch records from a batch run.
///
/// The stream ends only after every worker has forwarded its sentinel,
/// so workers finishing in any order cannot cut off a record another
/// worker still has in flight.
pub struct RecordStream {
    records: mpsc::Receiver<Option<ResponseRecord>>,
    workers_remaining: usize,
}

impl RecordStream {
    fn new(records: mpsc::Receiver<Option<ResponseRecord>>, worker_count: usize) -> Self {
        Self {
            records,
            workers_remaining: worker_count,
        }
    }
}

impl Stream for RecordStream {
    type Item = ResponseRecord;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.workers_remaining == 0 {
                return Poll::Ready(None);
            }
            match self.records.poll_recv(cx) {
                Poll::Ready(Some(Some(record))) => return Poll::Ready(Some(record)),
                Poll::Ready(Some(None)) => {
                    // One worker finished; keep reading for the rest
                    self.workers_remaining -= 1;
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl std::fmt::Debug for RecordStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream")
            .field("workers_remaining", &self.workers_remaining)
            .finish_non_exhaustive()
    }
}
