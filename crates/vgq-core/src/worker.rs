//! Worker unit: one job in, one terminal outcome out.
//!
//! Runs the scrape-then-download sequence for a single job and reports
//! lifecycle events to the coordinator. Never escalates: every failure is
//! converted into one bounded `Failed` report, so no raw error crosses the
//! worker/coordinator boundary.

use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::download;
use crate::queue::{bounded_error, JobId};
use crate::scrape::{self, PageMetadata};

/// Lifecycle reports sent to the coordinator. Per job there is at most one
/// `ScrapeOk` followed by exactly one terminal report.
#[derive(Debug)]
pub enum WorkerReport {
    /// Source resolved; the job moves to downloading.
    ScrapeOk {
        job_id: JobId,
        metadata: PageMetadata,
    },
    /// All bytes flushed to `file_path`.
    DownloadOk {
        job_id: JobId,
        metadata: PageMetadata,
        file_path: PathBuf,
    },
    /// Terminal failure; message already bounded.
    Failed { job_id: JobId, error: String },
}

/// Per-execution inputs the coordinator hands a worker.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    /// Proxy for both the scrape and the download, drawn from the pool at dispatch.
    pub proxy: Option<String>,
    pub download_dir: PathBuf,
    pub scrape_timeout: Duration,
    pub download_timeout: Duration,
    /// Accept plain-http sources on loopback (local rigs without TLS).
    pub allow_loopback_sources: bool,
}

/// Executes one job. Single-shot: emits reports on `reports` and exits.
pub async fn run(
    job_id: JobId,
    source_link: String,
    ctx: WorkerContext,
    reports: mpsc::Sender<WorkerReport>,
) {
    tracing::info!(job_id, link = %source_link, proxy = ?ctx.proxy, "worker start");

    let metadata = match scrape::scrape(
        &source_link,
        ctx.proxy.as_deref(),
        ctx.scrape_timeout,
        ctx.allow_loopback_sources,
    )
    .await
    {
        Ok(m) => m,
        Err(e) => {
            send(&reports, fail(job_id, &e.to_string())).await;
            return;
        }
    };

    send(
        &reports,
        WorkerReport::ScrapeOk {
            job_id,
            metadata: metadata.clone(),
        },
    )
    .await;

    let referer = scrape::referer_for(&source_link);
    let outcome = download::download(
        &metadata.video_url,
        job_id,
        ctx.proxy.as_deref(),
        &referer,
        &ctx.download_dir,
        ctx.download_timeout,
    )
    .await;

    match outcome {
        Ok(file_path) => {
            send(
                &reports,
                WorkerReport::DownloadOk {
                    job_id,
                    metadata,
                    file_path,
                },
            )
            .await;
        }
        Err(e) => send(&reports, fail(job_id, &e.to_string())).await,
    }

    tracing::debug!(job_id, "worker exit");
}

fn fail(job_id: JobId, error: &str) -> WorkerReport {
    WorkerReport::Failed {
        job_id,
        error: bounded_error(error),
    }
}

async fn send(reports: &mpsc::Sender<WorkerReport>, report: WorkerReport) {
    if reports.send(report).await.is_err() {
        // Coordinator gone; nothing left to report to.
        tracing::debug!("worker report dropped: coordinator closed");
    }
}
