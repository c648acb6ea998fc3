//! End-to-end tests for concurrent batch fetching
//!
//! These run real HTTP exchanges against an in-process mock server and
//! exercise the public API the way an embedding application would: build a
//! client, hand the fetcher a mixed bag of tasks, and drain the stream.

mod common;

use common::{collect_records, fetch_client, mount_file};

use std::time::{Duration, Instant};

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use parfetch::{BatchFetcher, RequestSpec};

#[tokio::test]
async fn mixed_batch_yields_one_record_per_completed_fetch() {
    let server = MockServer::start().await;
    mount_file(&server, "/ok-1", b"first page").await;
    mount_file(&server, "/ok-2", b"second page").await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_bytes(b"gone".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/ok-2"))
        .mount(&server)
        .await;

    let tasks = vec![
        RequestSpec::new(format!("{}/ok-1", server.uri())),
        RequestSpec::new(format!("{}/missing", server.uri())),
        RequestSpec::new(format!("{}/moved", server.uri())),
        // Nothing listens on port 1; this fetch fails at the transport
        RequestSpec::new("http://127.0.0.1:1/unreachable"),
        // An empty URL is raised inside the worker and produces no record
        RequestSpec::new(""),
    ];

    let fetcher = BatchFetcher::new(fetch_client(), 3);
    let records = collect_records(fetcher.run(tasks)).await;

    assert_eq!(records.len(), 4, "four tasks completed a fetch, one was raised");

    let ok = records
        .iter()
        .find(|r| r.url.ends_with("/ok-1"))
        .expect("record for /ok-1");
    assert!(!ok.is_error());
    assert_eq!(ok.status, Some(200));
    assert_eq!(ok.body, b"first page");

    let missing = records
        .iter()
        .find(|r| r.url.ends_with("/missing"))
        .expect("record for /missing");
    assert!(missing.is_error());
    assert_eq!(missing.status, Some(404));
    assert_eq!(missing.body, b"gone", "error responses keep their body");

    let moved = records
        .iter()
        .find(|r| !r.history.is_empty())
        .expect("record with redirect history");
    assert!(moved.url.ends_with("/ok-2"), "final URL is the redirect target");
    assert_eq!(moved.body, b"second page");
    assert_eq!(moved.history.len(), 1);
    assert_eq!(moved.history[0].status, Some(301));

    let unreachable = records
        .iter()
        .find(|r| r.status.is_none())
        .expect("flagged transport failure record");
    assert!(unreachable.is_error());
    assert!(unreachable.url.contains("127.0.0.1:1"));
    assert!(unreachable.body.is_empty());
}

#[tokio::test]
async fn the_worker_pool_overlaps_slow_fetches() {
    let server = MockServer::start().await;
    for name in ["a", "b", "c", "d"] {
        Mock::given(method("GET"))
            .and(path(format!("/slow-{name}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"slow".to_vec())
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
    }
    let tasks: Vec<RequestSpec> = ["a", "b", "c", "d"]
        .iter()
        .map(|name| RequestSpec::new(format!("{}/slow-{name}", server.uri())))
        .collect();

    let fetcher = BatchFetcher::new(fetch_client(), 4);
    let started = Instant::now();
    let records = collect_records(fetcher.run(tasks)).await;
    let elapsed = started.elapsed();

    assert_eq!(records.len(), 4);
    // Serial execution would take at least 1200ms
    assert!(
        elapsed < Duration::from_millis(900),
        "four 300ms fetches across four workers took {elapsed:?}"
    );
}

#[tokio::test]
async fn a_single_worker_drains_the_whole_batch() {
    let server = MockServer::start().await;
    for index in 0..20 {
        Mock::given(method("GET"))
            .and(path(format!("/page-{index}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(format!("payload-{index}").into_bytes()),
            )
            .mount(&server)
            .await;
    }
    let tasks: Vec<RequestSpec> = (0..20)
        .map(|index| RequestSpec::new(format!("{}/page-{index}", server.uri())))
        .collect();

    let fetcher = BatchFetcher::new(fetch_client(), 1);
    let records = collect_records(fetcher.run(tasks)).await;

    assert_eq!(records.len(), 20);
    for record in &records {
        let index = record
            .url
            .rsplit('-')
            .next()
            .expect("page URLs end in an index");
        assert_eq!(
            record.body,
            format!("payload-{index}").as_bytes(),
            "body must belong to the record's URL"
        );
    }
}
