//! Post-completion publish seam.
//!
//! Actual asset publication (CDN upload, site ingestion) lives outside the
//! core; the coordinator invokes this trait after a successful download when
//! an implementation is configured, driving `downloading -> uploading ->
//! completed/failed`.

use async_trait::async_trait;

use crate::queue::{Destination, JobId, ResultPayload};

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        job_id: JobId,
        result: &ResultPayload,
        destination: Destination,
    ) -> anyhow::Result<()>;
}

/// Publisher that only logs. Useful for demos and tests of the uploading path.
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(
        &self,
        job_id: JobId,
        result: &ResultPayload,
        destination: Destination,
    ) -> anyhow::Result<()> {
        tracing::info!(
            job_id,
            file = %result.file_path,
            destination = destination.as_str(),
            "publish (log only)"
        );
        Ok(())
    }
}
