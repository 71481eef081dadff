//! `vgq remove <id>` – drop a job; optionally delete its media with --delete-file.

use anyhow::Result;
use std::path::Path;
use vgq_core::download;
use vgq_core::protocol::Request;
use vgq_core::queue::JobStore;

use crate::cli::event_socket;

/// Removes through the running queue when one is listening, otherwise
/// straight from the DB. With `delete_file`, the job's media file under
/// `download_dir` (or the current directory's `downloads/`) is deleted too.
pub async fn run_remove(id: i64, delete_file: bool, download_dir: Option<&Path>) -> Result<()> {
    if delete_file {
        let dir = match download_dir {
            Some(d) => d.to_path_buf(),
            None => std::env::current_dir()?.join("downloads"),
        };
        let path = download::media_path(&dir, id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "deleted media file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), "could not delete media file: {}", e),
        }
    }

    let removed = match event_socket::send_request(&Request::Remove { job_id: id }).await? {
        Some(ack) => ack.ok,
        None => JobStore::open_default().await?.remove_job(id).await?,
    };

    if removed {
        println!("Removed job {id}");
    } else {
        println!("No job {id}");
    }
    Ok(())
}
