//! `vgq add <link>` – submit a video page link to the queue.

use anyhow::Result;
use vgq_core::config::VgqConfig;
use vgq_core::protocol::Request;
use vgq_core::queue::{validate_link, Destination, JobStore, Submission};

use crate::cli::event_socket;

/// Submits through a running queue when one is listening on the socket;
/// otherwise validates the link locally and enqueues straight into the DB.
pub async fn run_add(
    cfg: &VgqConfig,
    link: &str,
    destination: Destination,
    credential: Option<String>,
) -> Result<()> {
    let submission = Submission {
        source_link: link.to_string(),
        destination,
        credential,
    };

    if let Some(ack) = event_socket::send_request(&Request::submit(submission)).await? {
        return match (ack.ok, ack.job_id) {
            (true, Some(id)) => {
                println!("Added job {id} for link: {link}");
                Ok(())
            }
            _ => {
                let reason = ack.error.unwrap_or_else(|| "rejected".to_string());
                anyhow::bail!("queue rejected the link: {reason}")
            }
        };
    }

    validate_link(link, &cfg.allowed_hosts)?;
    let store = JobStore::open_default().await?;
    let id = store.add_job(link, destination).await?;
    println!("Added job {id} for link: {link}");
    Ok(())
}
