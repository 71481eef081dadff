//! Job read operations: list and get.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::super::types::{Destination, JobId, JobRecord, JobStatus, ResultPayload};
use super::JobStore;

fn record_from_row(row: &SqliteRow) -> Result<JobRecord> {
    let result_json: Option<String> = row.get("result_json");
    let result: Option<ResultPayload> = match result_json {
        Some(json) => Some(serde_json::from_str(&json)?),
        None => None,
    };
    Ok(JobRecord {
        id: row.get("id"),
        source_link: row.get("source_link"),
        destination: Destination::from_str(row.get("destination")),
        status: JobStatus::from_str(row.get("status")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        result,
        error: row.get("error"),
    })
}

impl JobStore {
    /// List all jobs in submission order (the queue's dispatch order).
    pub async fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, source_link, destination, status, error, result_json, created_at, updated_at
            FROM jobs
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(record_from_row(&row)?);
        }
        Ok(out)
    }

    /// Fetch one job by id, or None if it was removed.
    pub async fn get_job(&self, id: JobId) -> Result<Option<JobRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, source_link, destination, status, error, result_json, created_at, updated_at
            FROM jobs
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(record_from_row(&row)?)),
            None => Ok(None),
        }
    }
}
