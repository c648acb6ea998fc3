//! Common test utilities for parfetch integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parfetch::{Config, FetchClient, ProgressSink, RecordStream, ResponseRecord};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Deterministic payload of `len` bytes for content assertions
pub fn sequential_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// A fetch client built from the default configuration
pub fn fetch_client() -> Arc<FetchClient> {
    Arc::new(FetchClient::new(Config::default()).expect("default config must build a client"))
}

/// Mount a plain 200 response serving `payload` at `at`
pub async fn mount_file(server: &MockServer, at: &str, payload: &[u8]) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.to_vec()))
        .mount(server)
        .await;
}

/// Mount one 206 mock per segment range of `payload`, taking precedence
/// over any plain mock on the same path
pub async fn mount_segment_ranges(server: &MockServer, at: &str, payload: &[u8], count: usize) {
    for range in parfetch::segment::split_ranges(payload.len() as u64, count) {
        Mock::given(method("GET"))
            .and(path(at))
            .and(header("range", range.header_value().as_str()))
            .respond_with(
                ResponseTemplate::new(206)
                    .set_body_bytes(payload[range.start as usize..=range.end as usize].to_vec()),
            )
            .with_priority(1)
            .mount(server)
            .await;
    }
}

/// Progress sink that records every (total, completed) report
#[derive(Default)]
pub struct RecordingSink(pub Mutex<Vec<(u64, u64)>>);

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn report(&self, total: u64, completed: u64) {
        self.0
            .lock()
            .expect("sink mutex poisoned")
            .push((total, completed));
    }
}

/// Drain a record stream, guarding against a stream that never terminates
pub async fn collect_records(mut stream: RecordStream) -> Vec<ResponseRecord> {
    tokio::time::timeout(Duration::from_secs(30), async {
        let mut records = Vec::new();
        while let Some(record) = stream.next().await {
            records.push(record);
        }
        records
    })
    .await
    .expect("record stream did not terminate")
}
