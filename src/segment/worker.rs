//! Segment worker: fetches one byte range into its temp file.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::TryStreamExt;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::client::FetchClient;
use crate::error::{Error, Result};
use crate::types::{ByteRange, RequestSpec};

/// Read granularity for the response body stream
pub(crate) const CHUNK_SIZE: usize = 16 * 1024;

/// Everything one segment worker needs.
pub(crate) struct SegmentWorkerParams {
    /// Shared fetch client
    pub(crate) client: Arc<FetchClient>,
    /// Request the segment belongs to
    pub(crate) spec: RequestSpec,
    /// Segment index, for logging and error messages
    pub(crate) index: usize,
    /// Byte range this worker is responsible for
    pub(crate) range: ByteRange,
    /// Temp file the segment is appended to
    pub(crate) temp_path: PathBuf,
    /// Shared counter of bytes on disk for this segment
    pub(crate) fetched: Arc<AtomicU64>,
    /// Deadline for each chunk read off the body stream
    pub(crate) read_timeout: Duration,
}

/// Download one segment, appending to its temp file.
///
/// Bytes already on disk from an earlier run advance the start of the
/// requested range; when the adjusted start reaches or exceeds the
/// range end the segment counts as complete and no request is made.
/// Each chunk is flushed before the shared counter advances, so the
/// counter never runs ahead of the bytes on disk.
pub(crate) async fn fetch_segment(params: SegmentWorkerParams) -> Result<()> {
    let SegmentWorkerParams {
        client,
        spec,
        index,
        range,
        temp_path,
        fetched,
        read_timeout,
    } = params;

    let existing = match tokio::fs::metadata(&temp_path).await {
        Ok(meta) => meta.len(),
        Err(_) => 0,
    };
    if existing > 0 {
        fetched.store(existing, Ordering::Relaxed);
    }

    let start = range.start + existing;
    if start >= range.end {
        debug!(
            segment = index,
            bytes = existing,
            "temp file already covers the range, skipping fetch"
        );
        return Ok(());
    }

    let remaining = ByteRange::new(start, range.end);
    debug!(segment = index, range = %remaining, resumed = existing, "fetching segment");

    let response = client.open_range(&spec, remaining).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Request(format!(
            "segment {index} request returned HTTP status {status}"
        )));
    }

    let stream = response.bytes_stream().map_err(std::io::Error::other);
    let mut reader = StreamReader::new(stream);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&temp_path)
        .await?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let read = tokio::time::timeout(read_timeout, reader.read(&mut buf))
            .await
            .map_err(|_| Error::Timeout {
                url: spec.url().to_string(),
            })??;
        if read == 0 {
            break;
        }
        file.write_all(&buf[..read]).await?;
        file.flush().await?;
        fetched.fetch_add(read as u64, Ordering::Relaxed);
    }

    debug!(
        segment = index,
        bytes = fetched.load(Ordering::Relaxed),
        "segment complete"
    );
    Ok(())
}
