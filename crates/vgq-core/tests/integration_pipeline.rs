//! End-to-end tests: local site server, coordinator, worker, downloader.
//!
//! The server lives on loopback and serves a scrapeable page whose sources
//! point back at itself, so the whole scrape -> download -> report pipeline
//! runs without leaving the machine.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use vgq_core::download::{self, DownloadError};
use vgq_core::proxy::ProxyPool;
use vgq_core::publish::{LogPublisher, Publisher};
use vgq_core::queue::{
    Coordinator, CoordinatorConfig, Destination, JobId, JobStatus, JobStore, QueueEvent,
    ResultPayload, Submission,
};
use vgq_core::scrape;

fn media_body() -> Vec<u8> {
    (0u8..=255).cycle().take(48 * 1024).collect()
}

fn cfg(download_dir: &std::path::Path) -> CoordinatorConfig {
    CoordinatorConfig {
        max_workers: 2,
        allowed_hosts: vec!["127.0.0.1".into()],
        download_dir: download_dir.to_path_buf(),
        scrape_timeout: Duration::from_secs(10),
        download_timeout: Duration::from_secs(30),
        // The in-process server has no TLS.
        allow_loopback_sources: true,
    }
}

fn submission(base: &str) -> Submission {
    Submission {
        source_link: format!("{base}watch/42"),
        destination: Destination::Both,
        credential: None,
    }
}

async fn next_event(rx: &mut broadcast::Receiver<QueueEvent>) -> QueueEvent {
    tokio::time::timeout(Duration::from_secs(30), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn scrape_picks_best_source_and_metadata() {
    let base = common::site_server::start(media_body());
    let page_url = format!("{base}watch/42");

    let meta = scrape::scrape(&page_url, None, Duration::from_secs(10), true)
        .await
        .expect("scrape");

    assert!(meta.video_url.ends_with("clip-720p.mp4"), "{}", meta.video_url);
    assert_eq!(meta.title, "Night Drive");
    assert_eq!(meta.tags, vec!["cars", "night"]);
    assert_eq!(meta.thumbnail_url, Some(format!("{base}media/thumb.jpg")));
}

#[tokio::test]
async fn default_scrape_rejects_cleartext_loopback_sources() {
    // Without the explicit opt-in, the page's http sources must all be
    // filtered out even though the host is loopback.
    let base = common::site_server::start(media_body());
    let page_url = format!("{base}watch/42");

    let err = scrape::scrape(&page_url, None, Duration::from_secs(10), false)
        .await
        .expect_err("https-only filter applies");
    assert!(matches!(err, scrape::ScrapeError::NoPlayableSource));
}

#[tokio::test]
async fn download_streams_full_body_to_job_path() {
    let body = media_body();
    let base = common::site_server::start(body.clone());
    let dir = tempfile::tempdir().unwrap();

    let url = format!("{base}media/clip-720p.mp4");
    let path = download::download(&url, 5, None, &base, dir.path(), Duration::from_secs(30))
        .await
        .expect("download");

    assert_eq!(path, dir.path().join("5.mp4"));
    assert_eq!(std::fs::read(&path).unwrap(), body);
}

#[tokio::test]
async fn interrupted_download_cleans_up_partial_file() {
    let base = common::site_server::start_with_broken_media(media_body());
    let dir = tempfile::tempdir().unwrap();

    let url = format!("{base}media/broken-720p.mp4");
    let err = download::download(&url, 6, None, &base, dir.path(), Duration::from_secs(30))
        .await
        .expect_err("transfer dies mid-stream");
    assert!(matches!(
        err,
        DownloadError::Fetch(_) | DownloadError::Io(_)
    ));

    assert!(
        !dir.path().join("6.mp4").exists(),
        "no partial file left behind"
    );
}

#[tokio::test]
async fn stalled_download_hits_deadline_and_cleans_up() {
    let base = common::site_server::start(media_body());
    let dir = tempfile::tempdir().unwrap();

    // The "slow" media path stalls mid-body for longer than this deadline.
    let url = format!("{base}media/slow-720p.mp4");
    let err = download::download(&url, 8, None, &base, dir.path(), Duration::from_secs(1))
        .await
        .expect_err("deadline fires first");
    assert!(matches!(err, DownloadError::TimedOut(_)), "{err}");

    assert!(
        !dir.path().join("8.mp4").exists(),
        "no partial file left behind after timeout"
    );
}

#[tokio::test]
async fn pipeline_completes_job_with_full_event_trail() {
    let base = common::site_server::start(media_body());
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::open_memory().await.unwrap();
    let coordinator = Coordinator::start(store, cfg(dir.path()), ProxyPool::default(), None, None)
        .await
        .unwrap();
    let mut rx = coordinator.subscribe();

    let id = coordinator.submit(submission(&base)).await.unwrap();

    match next_event(&mut rx).await {
        QueueEvent::Added { job } => assert_eq!(job.id, id),
        other => panic!("expected added, got {other:?}"),
    }
    assert_eq!(next_event(&mut rx).await, QueueEvent::Processing { job_id: id });
    assert_eq!(next_event(&mut rx).await, QueueEvent::Downloading { job_id: id });
    match next_event(&mut rx).await {
        QueueEvent::Completed { job_id, result } => {
            assert_eq!(job_id, id);
            assert_eq!(result.title, "Night Drive");
            assert!(result.video_url.ends_with("clip-720p.mp4"));
            assert_eq!(result.file_path, dir.path().join(format!("{id}.mp4")).display().to_string());
            assert!(std::path::Path::new(&result.file_path).exists());
        }
        other => panic!("expected completed, got {other:?}"),
    }

    let jobs = coordinator.snapshot().await;
    assert_eq!(jobs[0].status, JobStatus::Completed);
    assert!(jobs[0].result.is_some());
    assert!(jobs[0].error.is_none());
}

#[tokio::test]
async fn configured_publisher_adds_uploading_stage() {
    let base = common::site_server::start(media_body());
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::open_memory().await.unwrap();
    let coordinator = Coordinator::start(
        store,
        cfg(dir.path()),
        ProxyPool::default(),
        Some(Arc::new(LogPublisher)),
        None,
    )
    .await
    .unwrap();
    let mut rx = coordinator.subscribe();

    let id = coordinator.submit(submission(&base)).await.unwrap();

    let mut stages = Vec::new();
    loop {
        match next_event(&mut rx).await {
            QueueEvent::Added { .. } => stages.push("added"),
            QueueEvent::Processing { .. } => stages.push("processing"),
            QueueEvent::Downloading { .. } => stages.push("downloading"),
            QueueEvent::Uploading { .. } => stages.push("uploading"),
            QueueEvent::Completed { job_id, .. } => {
                assert_eq!(job_id, id);
                stages.push("completed");
                break;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(
        stages,
        vec!["added", "processing", "downloading", "uploading", "completed"]
    );
}

struct RefusingPublisher;

#[async_trait::async_trait]
impl Publisher for RefusingPublisher {
    async fn publish(
        &self,
        _job_id: JobId,
        _result: &ResultPayload,
        _destination: Destination,
    ) -> anyhow::Result<()> {
        anyhow::bail!("site rejected the asset")
    }
}

#[tokio::test]
async fn publish_failure_moves_uploading_job_to_failed() {
    let base = common::site_server::start(media_body());
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::open_memory().await.unwrap();
    let coordinator = Coordinator::start(
        store,
        cfg(dir.path()),
        ProxyPool::default(),
        Some(Arc::new(RefusingPublisher)),
        None,
    )
    .await
    .unwrap();
    let mut rx = coordinator.subscribe();

    let id = coordinator.submit(submission(&base)).await.unwrap();

    let mut saw_uploading = false;
    let mut failures = 0;
    loop {
        match next_event(&mut rx).await {
            QueueEvent::Uploading { job_id } => {
                assert_eq!(job_id, id);
                saw_uploading = true;
            }
            QueueEvent::Failed { job_id, error } => {
                assert_eq!(job_id, id);
                assert!(error.contains("site rejected the asset"), "{error}");
                failures += 1;
                break;
            }
            QueueEvent::Completed { .. } => panic!("publish failure must not complete"),
            _ => {}
        }
    }
    assert!(saw_uploading, "failure happens after the uploading stage");

    // No late second failed event; the queue settles on one terminal state.
    tokio::time::sleep(Duration::from_millis(100)).await;
    while let Ok(event) = rx.try_recv() {
        assert!(
            !matches!(event, QueueEvent::Failed { .. }),
            "exactly one failed event"
        );
    }
    assert_eq!(failures, 1);

    let jobs = coordinator.snapshot().await;
    assert_eq!(jobs[0].status, JobStatus::Failed);
    let err = jobs[0].error.as_deref().unwrap();
    assert!(err.starts_with("publish failed"), "{err}");
    assert!(jobs[0].result.is_none());
}

#[tokio::test]
async fn broken_media_fails_job_and_leaves_no_file() {
    let base = common::site_server::start_with_broken_media(media_body());
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::open_memory().await.unwrap();
    let coordinator = Coordinator::start(store, cfg(dir.path()), ProxyPool::default(), None, None)
        .await
        .unwrap();
    let mut rx = coordinator.subscribe();

    let id = coordinator.submit(submission(&base)).await.unwrap();

    loop {
        match next_event(&mut rx).await {
            QueueEvent::Failed { job_id, error } => {
                assert_eq!(job_id, id);
                assert!(!error.is_empty());
                break;
            }
            QueueEvent::Completed { .. } => panic!("job must not complete"),
            _ => {}
        }
    }

    assert!(!dir.path().join(format!("{id}.mp4")).exists());
    let jobs = coordinator.snapshot().await;
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert!(jobs[0].error.is_some());
    assert!(jobs[0].result.is_none());
}
