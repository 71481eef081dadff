//! Job queue coordinator.
//!
//! Single-owner actor: every queue mutation funnels through one serialized
//! loop (submissions, removals, requeues, worker reports), so the state
//! machine's invariants hold under concurrent dispatch. Workers never touch
//! shared state; they only send reports. Every transition is broadcast to
//! subscribers exactly once.

mod actor;


use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::VgqConfig;
use crate::proxy::ProxyPool;
use crate::publish::Publisher;

use super::events::QueueEvent;
use super::store::JobStore;
use super::types::{Destination, JobId, JobRecord};

/// Runtime knobs for the coordinator, usually derived from [`VgqConfig`].
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Bound on concurrently running worker units.
    pub max_workers: usize,
    /// Host substrings a submitted link must match; empty rejects everything.
    pub allowed_hosts: Vec<String>,
    pub download_dir: PathBuf,
    pub scrape_timeout: Duration,
    pub download_timeout: Duration,
    /// Accept plain-http media sources on loopback IPv4. For local rigs
    /// without TLS; never derived from the user config.
    pub allow_loopback_sources: bool,
}

impl CoordinatorConfig {
    pub fn from_config(cfg: &VgqConfig, download_dir: PathBuf) -> Self {
        Self {
            max_workers: cfg.max_workers.max(1),
            allowed_hosts: cfg.allowed_hosts.clone(),
            download_dir,
            scrape_timeout: Duration::from_secs(cfg.scrape_timeout_secs),
            download_timeout: Duration::from_secs(cfg.download_timeout_secs),
            allow_loopback_sources: false,
        }
    }
}

/// One job submission from a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub source_link: String,
    pub destination: Destination,
    /// Opaque credential, checked by the configured [`CredentialCheck`].
    #[serde(default)]
    pub credential: Option<String>,
}

/// Rejection reasons surfaced to the submitting client. The job is never
/// created when submission fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("link is not a valid http(s) URL")]
    InvalidLink,
    #[error("link host is not on the allow list")]
    DisallowedHost,
    #[error("submission credential rejected")]
    Unauthorized,
    #[error("queue is shut down")]
    Closed,
}

/// Validates the opaque submitter credential. The default (no checker
/// configured) allows everything; real authorization lives outside the core.
pub trait CredentialCheck: Send + Sync {
    fn authorize(&self, credential: Option<&str>) -> bool;
}

/// A link is accepted only if it parses as an http(s) URL with a host that
/// matches one of the allow-listed substrings.
pub fn validate_link(link: &str, allowed_hosts: &[String]) -> Result<(), SubmitError> {
    let parsed = url::Url::parse(link).map_err(|_| SubmitError::InvalidLink)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SubmitError::InvalidLink);
    }
    let Some(host) = parsed.host_str() else {
        return Err(SubmitError::InvalidLink);
    };
    if !allowed_hosts.iter().any(|a| host.contains(a.as_str())) {
        return Err(SubmitError::DisallowedHost);
    }
    Ok(())
}

pub(crate) enum Command {
    Submit {
        submission: Submission,
        reply: oneshot::Sender<Result<JobId, SubmitError>>,
    },
    Remove {
        job_id: JobId,
        reply: oneshot::Sender<bool>,
    },
    Requeue {
        job_id: JobId,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<JobRecord>>,
    },
}

/// Cloneable handle to a running coordinator actor.
#[derive(Clone)]
pub struct Coordinator {
    cmd_tx: mpsc::Sender<Command>,
    events: broadcast::Sender<QueueEvent>,
}

impl Coordinator {
    /// Recovers jobs stranded in active states, then starts the actor loop.
    /// The actor stops once every handle is dropped and in-flight workers
    /// have finished.
    pub async fn start(
        store: JobStore,
        cfg: CoordinatorConfig,
        proxies: ProxyPool,
        publisher: Option<Arc<dyn Publisher>>,
        credential_check: Option<Arc<dyn CredentialCheck>>,
    ) -> Result<Self> {
        let recovered = store.recover_interrupted_jobs().await?;
        if recovered > 0 {
            tracing::info!("recovered {} job(s) from previous run", recovered);
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (events, _) = broadcast::channel(256);
        actor::spawn(
            store,
            cfg,
            proxies,
            publisher,
            credential_check,
            events.clone(),
            cmd_rx,
        );

        Ok(Self { cmd_tx, events })
    }

    /// New receiver for the transition event stream. Slow subscribers that
    /// lag behind the channel capacity miss events and should resync with a
    /// snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Submit one job. On acceptance the canonical id is returned and an
    /// `added` event is broadcast exactly once.
    pub async fn submit(&self, submission: Submission) -> Result<JobId, SubmitError> {
        let (reply, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(Command::Submit { submission, reply })
            .await
            .is_err()
        {
            return Err(SubmitError::Closed);
        }
        rx.await.unwrap_or(Err(SubmitError::Closed))
    }

    /// Remove a job by id. Removal of an in-flight job is best-effort: the
    /// worker finishes on its own and its late reports are discarded.
    pub async fn remove(&self, job_id: JobId) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(Command::Remove { job_id, reply })
            .await
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Requeue a failed job (the only backward transition).
    pub async fn requeue(&self, job_id: JobId) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(Command::Requeue { job_id, reply })
            .await
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Full queue snapshot for bootstrap/resync; supersedes any optimistic
    /// client-side state for the jobs it contains.
    pub async fn snapshot(&self) -> Vec<JobRecord> {
        let (reply, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(Command::Snapshot { reply })
            .await
            .is_err()
        {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }
}
