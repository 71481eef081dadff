//! Streaming media downloader.
//!
//! Pipes the remote body to `<dir>/<job_id>.mp4` chunk by chunk (constant
//! memory regardless of file size) under an overall deadline. Any failure
//! removes the partial file best-effort before surfacing the error.

use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::agent;
use crate::http::client_for;
use crate::queue::JobId;

const MEDIA_ACCEPT: &str = "video/mp4,video/*;q=0.9,*/*;q=0.8";

/// Download failures. Timeouts are treated the same as network failures:
/// terminal for the attempt.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("media fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("media returned HTTP {0}")]
    HttpStatus(u16),
    #[error("disk write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("download exceeded {}s deadline", .0.as_secs())]
    TimedOut(Duration),
}

/// Target path for a job's media file. Collision-free because job ids are unique.
pub fn media_path(dir: &Path, job_id: JobId) -> PathBuf {
    dir.join(format!("{job_id}.mp4"))
}

/// Streams `video_url` through `proxy` to the job's media path, creating
/// `dir` if absent. Returns the final path once all bytes are flushed.
pub async fn download(
    video_url: &str,
    job_id: JobId,
    proxy: Option<&str>,
    referer: &str,
    dir: &Path,
    deadline: Duration,
) -> Result<PathBuf, DownloadError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = media_path(dir, job_id);

    let outcome = tokio::time::timeout(
        deadline,
        stream_to_file(video_url, proxy, referer, &path),
    )
    .await;

    match outcome {
        Ok(Ok(())) => Ok(path),
        Ok(Err(e)) => {
            remove_partial(&path).await;
            Err(e)
        }
        Err(_elapsed) => {
            remove_partial(&path).await;
            Err(DownloadError::TimedOut(deadline))
        }
    }
}

async fn stream_to_file(
    video_url: &str,
    proxy: Option<&str>,
    referer: &str,
    path: &Path,
) -> Result<(), DownloadError> {
    let client = client_for(proxy, None)?;
    let resp = client
        .get(video_url)
        .header(reqwest::header::USER_AGENT, agent::random_user_agent())
        .header(reqwest::header::REFERER, referer)
        .header(reqwest::header::ACCEPT, MEDIA_ACCEPT)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(DownloadError::HttpStatus(status.as_u16()));
    }

    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = resp.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;

    tracing::debug!(path = %path.display(), bytes = written, "download complete");
    Ok(())
}

/// Best-effort removal of a partial file. Failure to delete is logged, not escalated.
async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "could not remove partial file: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_path_is_job_id_derived() {
        let p = media_path(Path::new("/tmp/dl"), 42);
        assert_eq!(p, PathBuf::from("/tmp/dl/42.mp4"));
    }
}
