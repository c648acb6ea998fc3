//! Partitioning of a resource into contiguous byte ranges.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use crate::types::ByteRange;

/// One planned segment of a download.
#[derive(Debug, Clone)]
pub struct SegmentTask {
    /// Zero-based position of this segment in the reassembly order
    pub index: usize,
    /// Inclusive byte range this segment covers
    pub range: ByteRange,
    /// Temp file the segment is written to
    pub temp_path: PathBuf,
    /// Bytes of this segment already on disk, written by the worker and
    /// read by the progress reporter
    pub fetched: Arc<AtomicU64>,
}

/// Split `[0, size)` into at most `count` contiguous inclusive ranges.
///
/// The per-range length is the ceiling of `size / count`, so all ranges
/// except the last have equal length and the last absorbs the division
/// remainder. When `size` is too small for `count` ranges of that
/// length, fewer ranges are produced; the union is always exactly
/// `[0, size)` with no gaps or overlaps and every range is at least one
/// byte long.
pub fn split_ranges(size: u64, count: usize) -> Vec<ByteRange> {
    if size == 0 {
        return Vec::new();
    }
    let count = count.max(1) as u64;
    let length = size.div_ceil(count);
    (0..count)
        .map_while(|i| {
            let start = i * length;
            if start >= size {
                return None;
            }
            Some(ByteRange::new(start, ((i + 1) * length - 1).min(size - 1)))
        })
        .collect()
}

/// Plan the segment tasks for downloading `size` bytes to `output`.
///
/// Temp files sit beside the output file and are named from it plus the
/// segment index, so a later run with the same output file resumes the
/// same temps.
pub fn plan_segments(output: &Path, size: u64, count: usize) -> Vec<SegmentTask> {
    split_ranges(size, count)
        .into_iter()
        .enumerate()
        .map(|(index, range)| SegmentTask {
            index,
            range,
            temp_path: temp_path_for(output, index),
            fetched: Arc::new(AtomicU64::new(0)),
        })
        .collect()
}

fn temp_path_for(output: &Path, index: usize) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(format!("_tmp_{index}.partial"));
    PathBuf::from(name)
}
