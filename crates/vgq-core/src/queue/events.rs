//! Broadcast events: exactly one per state transition, named for the
//! transition's target. `added` carries the full record and `snapshot` the
//! full queue so clients can bootstrap/resync and reconcile by job id.

use serde::{Deserialize, Serialize};

use super::types::{JobId, JobRecord, ResultPayload};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    Added { job: JobRecord },
    Removed { job_id: JobId },
    Processing { job_id: JobId },
    Downloading { job_id: JobId },
    Uploading { job_id: JobId },
    Completed { job_id: JobId, result: ResultPayload },
    Failed { job_id: JobId, error: String },
    Requeued { job_id: JobId },
    Snapshot { jobs: Vec<JobRecord> },
}

impl QueueEvent {
    /// Job id the event refers to, when it refers to a single job.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            QueueEvent::Added { job } => Some(job.id),
            QueueEvent::Removed { job_id }
            | QueueEvent::Processing { job_id }
            | QueueEvent::Downloading { job_id }
            | QueueEvent::Uploading { job_id }
            | QueueEvent::Completed { job_id, .. }
            | QueueEvent::Failed { job_id, .. }
            | QueueEvent::Requeued { job_id } => Some(*job_id),
            QueueEvent::Snapshot { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_tag_by_transition_target() {
        let json = serde_json::to_string(&QueueEvent::Downloading { job_id: 7 }).unwrap();
        assert_eq!(json, r#"{"event":"downloading","job_id":7}"#);

        let parsed: QueueEvent =
            serde_json::from_str(r#"{"event":"requeued","job_id":3}"#).unwrap();
        assert_eq!(parsed, QueueEvent::Requeued { job_id: 3 });
    }

    #[test]
    fn failed_event_carries_message() {
        let e = QueueEvent::Failed {
            job_id: 9,
            error: "page has no usable title".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains(r#""event":"failed""#));
        assert!(json.contains("no usable title"));
        assert_eq!(e.job_id(), Some(9));
    }
}
