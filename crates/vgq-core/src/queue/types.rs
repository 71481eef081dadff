//! Types for the job queue: statuses, destinations, job records.

use serde::{Deserialize, Serialize};

/// Job identifier, assigned by the store on acceptance.
pub type JobId = i64;

/// Maximum stored length of a failure message, in bytes. Worker errors are
/// truncated to this before they cross into the queue.
pub const MAX_ERROR_LEN: usize = 200;

/// Truncates an error message to [`MAX_ERROR_LEN`] on a char boundary.
pub fn bounded_error(msg: &str) -> String {
    if msg.len() <= MAX_ERROR_LEN {
        return msg.to_string();
    }
    let mut end = MAX_ERROR_LEN;
    while !msg.is_char_boundary(end) {
        end -= 1;
    }
    msg[..end].to_string()
}

/// Job status stored as a lowercase string in the database. Progression is
/// monotonic forward except for operator requeue (failed -> queued).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Downloading,
    Uploading,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Downloading => "downloading",
            JobStatus::Uploading => "uploading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "queued" => JobStatus::Queued,
            "processing" => JobStatus::Processing,
            "downloading" => JobStatus::Downloading,
            "uploading" => JobStatus::Uploading,
            "completed" => JobStatus::Completed,
            _ => JobStatus::Failed,
        }
    }

    /// Terminal states never transition further without operator action.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Where the finished asset should be delivered. Opaque to the core; it is
/// forwarded to the publish seam unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    #[serde(rename = "siteA")]
    SiteA,
    #[serde(rename = "siteB")]
    SiteB,
    #[serde(rename = "both")]
    Both,
}

impl Destination {
    pub fn as_str(self) -> &'static str {
        match self {
            Destination::SiteA => "siteA",
            Destination::SiteB => "siteB",
            Destination::Both => "both",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "siteA" => Destination::SiteA,
            "siteB" => Destination::SiteB,
            _ => Destination::Both,
        }
    }
}

/// Populated on completion: local file plus extracted metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub file_path: String,
    pub video_url: String,
    pub title: String,
    pub tags: Vec<String>,
    pub thumbnail_url: Option<String>,
}

/// One queue record. `result` is present iff completed; `error` iff failed.
/// Both invariants are enforced by the store's transition functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub source_link: String,
    pub destination: Destination,
    pub status: JobStatus,
    pub created_at: i64,
    pub updated_at: i64,
    pub result: Option<ResultPayload>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_string_roundtrip() {
        for s in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Downloading,
            JobStatus::Uploading,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::from_str(s.as_str()), s);
        }
        assert_eq!(JobStatus::from_str("garbage"), JobStatus::Failed);
    }

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Downloading.is_terminal());
    }

    #[test]
    fn destination_serde_names() {
        assert_eq!(
            serde_json::to_string(&Destination::SiteA).unwrap(),
            r#""siteA""#
        );
        assert_eq!(Destination::from_str("siteB"), Destination::SiteB);
        assert_eq!(Destination::from_str("unknown"), Destination::Both);
    }

    #[test]
    fn bounded_error_truncates_on_char_boundary() {
        let short = "network unreachable";
        assert_eq!(bounded_error(short), short);

        let long = "x".repeat(300);
        assert_eq!(bounded_error(&long).len(), MAX_ERROR_LEN);

        // Multi-byte character straddling the limit must not split.
        let tricky = format!("{}é{}", "a".repeat(MAX_ERROR_LEN - 1), "b".repeat(50));
        let out = bounded_error(&tricky);
        assert!(out.len() <= MAX_ERROR_LEN);
        assert!(out.is_char_boundary(out.len()));
    }
}
