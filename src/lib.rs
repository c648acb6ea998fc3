//! # parfetch
//!
//! Concurrent HTTP retrieval library for bulk fetching and accelerated
//! single-file downloads.
//!
//! ## Design Philosophy
//!
//! parfetch is designed to be:
//! - **Predictable** - Redirects are walked by hand and every hop is recorded
//! - **Lossless** - Failed fetches come back as flagged records, not silent gaps
//! - **Resumable** - Interrupted segmented downloads pick up from their temp files
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use parfetch::{BatchFetcher, Config, FetchClient, RequestSpec};
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(FetchClient::new(Config::default())?);
//!
//!     // Fetch one page, following redirects
//!     let record = client.send(&RequestSpec::new("https://example.com")).await?;
//!     println!("{} bytes from {}", record.body.len(), record.url);
//!
//!     // Fetch many pages concurrently
//!     let fetcher = BatchFetcher::new(Arc::clone(&client), 4);
//!     let tasks = vec![
//!         RequestSpec::new("https://example.com/a"),
//!         RequestSpec::new("https://example.com/b"),
//!     ];
//!     let mut records = fetcher.run(tasks);
//!     while let Some(record) = records.next().await {
//!         println!("{}: {:?}", record.url, record.status);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Concurrent batch fetching over a worker pool
pub mod batch;
/// HTTP client with manual redirect handling
pub mod client;
/// Configuration types
pub mod config;
/// Compressed body decoding
pub mod decoder;
/// Error types
pub mod error;
/// Segmented download with resume support
pub mod segment;
/// Core request and response types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use batch::{BatchFetcher, RecordStream};
pub use client::FetchClient;
pub use config::{BatchConfig, Config, HttpConfig, RedirectConfig, SegmentConfig};
pub use decoder::ContentEncoding;
pub use error::{Error, Result};
pub use segment::{NoOpProgress, ProgressSink, SegmentTask, SegmentedDownloader};
pub use types::{ByteRange, RedirectClass, RequestSpec, ResponseRecord};
