//! Job write operations: add, claim, guarded transitions, remove.

use anyhow::Result;
use sqlx::Row;

use super::super::types::{bounded_error, Destination, JobId, JobStatus, ResultPayload};
use super::{unix_timestamp, JobStore};

impl JobStore {
    /// Insert a new queued job. Returns the canonical id.
    pub async fn add_job(&self, source_link: &str, destination: Destination) -> Result<JobId> {
        let now = unix_timestamp();
        let row_id = sqlx::query(
            r#"
            INSERT INTO jobs (source_link, destination, status, error, result_json, created_at, updated_at)
            VALUES (?1, ?2, ?3, NULL, NULL, ?4, ?5)
            "#,
        )
        .bind(source_link)
        .bind(destination.as_str())
        .bind(JobStatus::Queued.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(row_id)
    }

    /// Atomically claim the oldest queued job by moving it to `processing`.
    /// A single UPDATE..RETURNING statement, so two concurrent dispatchers
    /// can never claim the same job. Returns None when nothing is queued.
    pub async fn claim_next_queued(&self) -> Result<Option<JobId>> {
        let now = unix_timestamp();
        let row = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'processing',
                updated_at = ?1
            WHERE id = (
                SELECT id FROM jobs
                WHERE status = 'queued'
                ORDER BY created_at ASC, id ASC
                LIMIT 1
            )
            RETURNING id
            "#,
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get::<i64, _>("id")))
    }

    /// processing -> downloading. Returns false if the job is not in
    /// `processing` anymore (removed, or a stale event).
    pub async fn mark_downloading(&self, id: JobId) -> Result<bool> {
        self.guarded_status_update(id, &["processing"], JobStatus::Downloading)
            .await
    }

    /// downloading -> uploading (publish seam engaged).
    pub async fn mark_uploading(&self, id: JobId) -> Result<bool> {
        self.guarded_status_update(id, &["downloading"], JobStatus::Uploading)
            .await
    }

    /// downloading/uploading -> completed; stores the result payload and
    /// clears any error so the terminal-field invariant holds.
    pub async fn mark_completed(&self, id: JobId, result: &ResultPayload) -> Result<bool> {
        let now = unix_timestamp();
        let result_json = serde_json::to_string(result)?;
        let r = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed',
                result_json = ?1,
                error = NULL,
                updated_at = ?2
            WHERE id = ?3 AND status IN ('downloading', 'uploading')
            "#,
        )
        .bind(result_json)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() > 0)
    }

    /// Any active state -> failed; stores a bounded error message and clears
    /// the result payload.
    pub async fn mark_failed(&self, id: JobId, error: &str) -> Result<bool> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed',
                error = ?1,
                result_json = NULL,
                updated_at = ?2
            WHERE id = ?3 AND status IN ('processing', 'downloading', 'uploading')
            "#,
        )
        .bind(bounded_error(error))
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() > 0)
    }

    /// Operator requeue: failed -> queued, error cleared. The only backward
    /// transition in the state machine.
    pub async fn requeue(&self, id: JobId) -> Result<bool> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'queued',
                error = NULL,
                updated_at = ?1
            WHERE id = ?2 AND status = 'failed'
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() > 0)
    }

    /// Normalize any job stranded in an active state back to `queued`
    /// (e.g. after a crash). Call before dispatching. Returns the count reset.
    pub async fn recover_interrupted_jobs(&self) -> Result<u64> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'queued',
                updated_at = ?1
            WHERE status IN ('processing', 'downloading', 'uploading')
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }

    /// Permanently remove a job row. Returns false if the id was unknown.
    /// File cleanup is handled by higher layers.
    pub async fn remove_job(&self, id: JobId) -> Result<bool> {
        let r = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() > 0)
    }

    async fn guarded_status_update(
        &self,
        id: JobId,
        from: &[&str],
        to: JobStatus,
    ) -> Result<bool> {
        // `from` is always one of the fixed status strings; build the IN
        // list inline rather than binding a variable-length set.
        let now = unix_timestamp();
        let in_list = from
            .iter()
            .map(|s| format!("'{s}'"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE jobs SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status IN ({in_list})"
        );
        let r = sqlx::query(&sql)
            .bind(to.as_str())
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected() > 0)
    }
}
