//! Subscriber socket: server (during `vgq run`) and client helpers.
//!
//! Newline-delimited JSON on a Unix socket. Each request line gets one ack;
//! a `subscribe` request turns the connection into a one-way event stream,
//! opened with a `snapshot` event. Malformed lines are answered with an
//! error ack and skipped.

use anyhow::Result;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

use vgq_core::protocol::{default_socket_path, Ack, Request};
use vgq_core::queue::{Coordinator, QueueEvent, Submission};

/// Spawns a task that serves the subscriber protocol on `path`. Each client
/// connection is handled in its own task with a clone of the coordinator handle.
pub fn spawn_event_listener(
    coordinator: Coordinator,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let handle = tokio::spawn(async move {
        let _ = std::fs::remove_file(&path);
        let listener = match UnixListener::bind(&path) {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(path = %path.display(), "subscriber socket bind: {}", e);
                return;
            }
        };
        tracing::info!(path = %path.display(), "subscriber socket listening");
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let coordinator = coordinator.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_client(coordinator, stream).await {
                            tracing::debug!("subscriber connection closed: {:#}", e);
                        }
                    });
                }
                Err(e) => tracing::debug!("subscriber socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

async fn serve_client(coordinator: Coordinator, stream: UnixStream) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let request: Request = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                write_json(&mut write, &Ack::rejected(format!("malformed request: {e}"))).await?;
                continue;
            }
        };

        match request {
            Request::Submit {
                source_link,
                destination,
                credential,
            } => {
                let submission = Submission {
                    source_link,
                    destination,
                    credential,
                };
                let ack = match coordinator.submit(submission).await {
                    Ok(id) => Ack::accepted(id),
                    Err(e) => Ack::rejected(e.to_string()),
                };
                write_json(&mut write, &ack).await?;
            }
            Request::Remove { job_id } => {
                let ack = Ack::done(coordinator.remove(job_id).await);
                write_json(&mut write, &ack).await?;
            }
            Request::Requeue { job_id } => {
                let ack = Ack::done(coordinator.requeue(job_id).await);
                write_json(&mut write, &ack).await?;
            }
            Request::Subscribe => {
                return stream_events(coordinator, write).await;
            }
        }
    }
    Ok(())
}

/// Snapshot first, then the live stream. A subscriber that lags behind the
/// broadcast capacity gets a fresh snapshot instead of the missed events.
async fn stream_events(
    coordinator: Coordinator,
    mut write: tokio::net::unix::OwnedWriteHalf,
) -> Result<()> {
    let mut rx = coordinator.subscribe();
    let jobs = coordinator.snapshot().await;
    write_json(&mut write, &QueueEvent::Snapshot { jobs }).await?;

    loop {
        match rx.recv().await {
            Ok(event) => write_json(&mut write, &event).await?,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                tracing::debug!(missed, "subscriber lagged, resyncing with snapshot");
                let jobs = coordinator.snapshot().await;
                write_json(&mut write, &QueueEvent::Snapshot { jobs }).await?;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(()),
        }
    }
}

async fn write_json<W, T>(write: &mut W, value: &T) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
    T: serde::Serialize,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    write.write_all(&line).await?;
    Ok(())
}

/// Sends a single request to a running queue. Returns None when no queue is
/// listening (socket absent), so callers can fall back to direct DB access.
pub async fn send_request(req: &Request) -> Result<Option<Ack>> {
    let path = default_socket_path()?;
    if !path.exists() {
        return Ok(None);
    }
    let stream = UnixStream::connect(&path).await?;
    let (read, mut write) = stream.into_split();
    write_json(&mut write, req).await?;

    let mut lines = BufReader::new(read).lines();
    let line = lines
        .next_line()
        .await?
        .ok_or_else(|| anyhow::anyhow!("queue closed the connection without an ack"))?;
    Ok(Some(serde_json::from_str(&line)?))
}

/// Subscribes to a running queue and calls `on_event` for every event line
/// until the queue shuts down.
pub async fn stream_from_queue(mut on_event: impl FnMut(QueueEvent)) -> Result<()> {
    let path = default_socket_path()?;
    if !path.exists() {
        anyhow::bail!("no running queue (socket {} not found)", path.display());
    }
    let stream = UnixStream::connect(&path).await?;
    let (read, mut write) = stream.into_split();
    write_json(&mut write, &Request::Subscribe).await?;

    let mut lines = BufReader::new(read).lines();
    while let Some(line) = lines.next_line().await? {
        match serde_json::from_str::<QueueEvent>(&line) {
            Ok(event) => on_event(event),
            Err(e) => tracing::warn!("unparseable event line: {}", e),
        }
    }
    Ok(())
}
