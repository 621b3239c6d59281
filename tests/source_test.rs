//! HTTP segment source and fetcher tests against a mock segment server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use bytes::Bytes;
use multivision::fetcher::SegmentFetcher;
use multivision::source::{FetchError, HttpSegmentSource, SegmentSource};
use multivision_common::{EntityKey, SegmentIndex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source_for(server: &MockServer) -> HttpSegmentSource {
    HttpSegmentSource::new(&server.uri(), "concert", Duration::from_secs(5))
}

#[tokio::test]
async fn fetches_segment_by_index() {
    let server = MockServer::start().await;
    let layout = common::layout(2, true);
    Mock::given(method("GET"))
        .and(path("/concert/3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(common::blob(layout, 3).to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let source = source_for(&server);
    let blob = tokio_test::assert_ok!(source.fetch(SegmentIndex::new(3)).await);
    assert_eq!(blob, common::blob(layout, 3));
    assert_eq!(source.describe(), format!("{}/concert", server.uri()));
}

#[tokio::test]
async fn missing_segment_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/concert/9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = source_for(&server)
        .fetch(SegmentIndex::new(9))
        .await
        .unwrap_err();
    assert_matches!(err, FetchError::NotFound(index) if index == SegmentIndex::new(9));
}

#[tokio::test]
async fn server_error_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = source_for(&server)
        .fetch(SegmentIndex::new(1))
        .await
        .unwrap_err();
    assert_matches!(err, FetchError::Status { status, .. } if status.as_u16() == 503);
}

#[tokio::test]
async fn metadata_is_fetched_next_to_segments() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/concert/metadata.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"cameraCount":4}"#))
        .mount(&server)
        .await;

    let raw = source_for(&server).fetch_metadata().await.unwrap();
    assert_eq!(raw, Bytes::from_static(br#"{"cameraCount":4}"#));
}

#[tokio::test]
async fn missing_metadata_is_reported_as_metadata_not_a_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/concert/metadata.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = source_for(&server).fetch_metadata().await.unwrap_err();
    assert_matches!(
        err,
        FetchError::MetadataUnavailable { ref url, status }
            if status.as_u16() == 404 && url.ends_with("/concert/metadata.json")
    );
    assert!(err.to_string().contains("metadata"));
    assert!(!err.to_string().contains("segment 0"));
}

#[tokio::test]
async fn fetcher_splits_http_blobs_and_advances() {
    let server = MockServer::start().await;
    let layout = common::layout(2, true);
    for index in 0..2 {
        Mock::given(method("GET"))
            .and(path(format!("/concert/{index}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(common::blob(layout, index).to_vec()),
            )
            .mount(&server)
            .await;
    }

    let fetcher = SegmentFetcher::new(Arc::new(source_for(&server)), layout);
    let mut delivered = Vec::new();
    for _ in 0..2 {
        let fetched = fetcher
            .fetch(common::camera(2), |key, index, bytes| {
                delivered.push((key, index, bytes))
            })
            .await
            .unwrap()
            .expect("no rewind happened");
        assert_eq!(fetched.requested_by, common::camera(2));
    }

    assert_eq!(fetcher.cursor(), SegmentIndex::new(2));
    assert!(!fetcher.is_fetching());
    assert_eq!(delivered.len(), 6);
    assert_eq!(
        delivered[4],
        (
            EntityKey::Camera(common::camera(2)),
            SegmentIndex::new(1),
            Bytes::from_static(b"c2s1")
        )
    );
    assert_eq!(
        delivered[5],
        (EntityKey::Audio, SegmentIndex::new(1), Bytes::from_static(b"as1"))
    );
}

#[tokio::test]
async fn malformed_blob_does_not_advance_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/concert/0"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 0]))
        .mount(&server)
        .await;

    let fetcher = SegmentFetcher::new(Arc::new(source_for(&server)), common::layout(3, true));
    let err = fetcher.fetch(common::camera(1), |_, _, _| {}).await.unwrap_err();

    assert_matches!(err, FetchError::Parse(_));
    assert_eq!(fetcher.cursor(), SegmentIndex::ZERO);
    assert!(!fetcher.is_fetching());
}
