//! `vgq status` – show all jobs and their states.

use anyhow::Result;
use vgq_core::queue::JobStore;

pub async fn run_status(store: &JobStore) -> Result<()> {
    let jobs = store.list_jobs().await?;
    if jobs.is_empty() {
        println!("No jobs in queue.");
        return Ok(());
    }

    println!(
        "{:<6} {:<12} {:<8} {}",
        "ID", "STATE", "DEST", "LINK"
    );
    for job in jobs {
        println!(
            "{:<6} {:<12} {:<8} {}",
            job.id,
            job.status.as_str(),
            job.destination.as_str(),
            job.source_link
        );
        if let Some(err) = &job.error {
            println!("       error: {err}");
        }
    }
    Ok(())
}
