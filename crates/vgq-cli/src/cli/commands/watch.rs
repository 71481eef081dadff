//! `vgq watch` – follow the running queue's event stream.

use anyhow::Result;

use crate::cli::event_socket;

/// Prints one JSON line per event, starting with the bootstrap snapshot,
/// until the queue shuts down or the user interrupts.
pub async fn run_watch() -> Result<()> {
    event_socket::stream_from_queue(|event| {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!("unprintable event: {}", e),
        }
    })
    .await
}
