//! Wire types for the live subscriber protocol.
//!
//! Transport is newline-delimited JSON over a local socket. Each request
//! line is answered with one [`Ack`]; after a `subscribe` request the
//! connection becomes a one-way event stream, opened by a `snapshot` event.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::queue::{Destination, JobId, Submission};

/// Default path for the subscriber socket (same XDG state dir as the job DB).
pub fn default_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("vgq")?.get_state_home();
    Ok(dir.join("vgq").join("vgq.sock"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Submit {
        source_link: String,
        destination: Destination,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        credential: Option<String>,
    },
    Remove {
        job_id: JobId,
    },
    Requeue {
        job_id: JobId,
    },
    Subscribe,
}

impl Request {
    pub fn submit(submission: Submission) -> Self {
        Request::Submit {
            source_link: submission.source_link,
            destination: submission.destination,
            credential: submission.credential,
        }
    }
}

/// Reply to one request line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    pub fn accepted(job_id: JobId) -> Self {
        Ack {
            ok: true,
            job_id: Some(job_id),
            error: None,
        }
    }

    pub fn done(ok: bool) -> Self {
        Ack {
            ok,
            job_id: None,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Ack {
            ok: false,
            job_id: None,
            error: Some(error.into()),
        }
    }
}
