//! Segmented resumable download of a single large resource.
//!
//! Split into focused submodules:
//! - [`planner`] - Byte-range partitioning and segment task planning
//! - [`worker`] - Per-segment ranged fetch with resume
//! - [`progress`] - Progress aggregation and the reporting sink
//!
//! The downloader resolves the resource's size and filename up front,
//! spawns one worker per byte range, polls their counters for progress,
//! and reassembles the temp files into the final output.

mod planner;
mod progress;
mod worker;


pub use planner::{SegmentTask, plan_segments, split_ranges};
pub use progress::{NoOpProgress, ProgressSink};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::FetchClient;
use crate::config::SegmentConfig;
use crate::error::{Error, Result};
use crate::types::RequestSpec;

/// Downloads one large resource as parallel byte-range segments.
pub struct SegmentedDownloader {
    client: Arc<FetchClient>,
    config: SegmentConfig,
    sink: Arc<dyn ProgressSink>,
}

impl SegmentedDownloader {
    /// Create a downloader that writes into `config.output_dir` and
    /// reports aggregated progress to `sink`.
    pub fn new(
        client: Arc<FetchClient>,
        config: SegmentConfig,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            client,
            config,
            sink,
        }
    }

    /// Download the resource behind `spec` as `segment_count` parallel
    /// segments and return the path of the assembled file.
    ///
    /// Temp files from an interrupted earlier run are resumed rather
    /// than refetched. Individual segment failures are logged and the
    /// shortfall is caught by the final size verification; only the
    /// preflight (size and filename resolution) and the verification
    /// itself are fatal.
    ///
    /// # Errors
    ///
    /// Returns an error when the resource's size or filename cannot be
    /// resolved, when writing the output fails, or when the assembled
    /// size differs from the expected total by more than the configured
    /// tolerance.
    pub async fn run(&self, spec: &RequestSpec, segment_count: usize) -> Result<PathBuf> {
        // Phase 1: preflight, both lookups are fatal on failure
        let total_size = self.client.size_of(spec).await?;
        let file_name = self.client.file_name_of(spec).await?;
        let output = self.config.output_dir.join(file_name);

        // Phase 2: plan segments and start the progress reporter
        let tasks = plan_segments(&output, total_size, segment_count);
        let counters: Vec<Arc<AtomicU64>> =
            tasks.iter().map(|t| Arc::clone(&t.fetched)).collect();
        let cancel_token = CancellationToken::new();
        let reporter = progress::spawn_progress_reporter(progress::ProgressReporterParams {
            total_size,
            counters,
            sink: Arc::clone(&self.sink),
            cancel_token: cancel_token.clone(),
        });

        info!(
            url = %spec.url(),
            segments = tasks.len(),
            size = total_size,
            output = %output.display(),
            "starting segmented download"
        );

        // Phase 3: fetch every segment in parallel
        let mut workers = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let params = worker::SegmentWorkerParams {
                client: Arc::clone(&self.client),
                spec: spec.clone(),
                index: task.index,
                range: task.range,
                temp_path: task.temp_path.clone(),
                fetched: Arc::clone(&task.fetched),
                read_timeout: self.client.request_timeout(),
            };
            workers.push(tokio::spawn(worker::fetch_segment(params)));
        }

        for (index, handle) in workers.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(segment = index, error = %e, "segment fetch failed");
                }
                Err(e) => {
                    warn!(segment = index, error = %e, "segment task panicked");
                }
            }
        }

        // Phase 4: stop the reporter before touching the temp files
        cancel_token.cancel();
        let _ = reporter.await;

        // Phase 5: reassemble and verify
        let final_size = reassemble(&tasks, &output).await?;
        if total_size.abs_diff(final_size) > self.config.size_tolerance {
            return Err(Error::Request(format!(
                "size verification failed for {}: expected {total_size} bytes, assembled {final_size}",
                output.display()
            )));
        }

        self.sink.report(total_size, final_size).await;
        info!(
            output = %output.display(),
            size = final_size,
            "segmented download complete"
        );
        Ok(output)
    }
}

impl std::fmt::Debug for SegmentedDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentedDownloader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Concatenate the temp files in segment-index order into the output
/// file, deleting each temp as it is consumed.
///
/// A missing temp file (its worker never got far enough to create it)
/// is skipped; the resulting shortfall is the size verification's
/// business. Returns the assembled size in bytes.
async fn reassemble(tasks: &[SegmentTask], output: &Path) -> Result<u64> {
    let mut assembled = File::create(output).await?;
    for task in tasks {
        match File::open(&task.temp_path).await {
            Ok(mut temp) => {
                tokio::io::copy(&mut temp, &mut assembled).await?;
                tokio::fs::remove_file(&task.temp_path).await?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(segment = task.index, "temp file missing during reassembly");
            }
            Err(e) => return Err(e.into()),
        }
    }
    assembled.flush().await?;
    Ok(assembled.metadata().await?.len())
}
