//! `vgq requeue <id>` – put a failed job back in line.

use anyhow::Result;
use vgq_core::protocol::Request;
use vgq_core::queue::JobStore;

use crate::cli::event_socket;

pub async fn run_requeue(id: i64) -> Result<()> {
    let requeued = match event_socket::send_request(&Request::Requeue { job_id: id }).await? {
        Some(ack) => ack.ok,
        None => JobStore::open_default().await?.requeue(id).await?,
    };

    if requeued {
        println!("Requeued job {id}");
    } else {
        println!("Job {id} is not in a failed state");
    }
    Ok(())
}
