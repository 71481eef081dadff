//! The coordinator's actor loop: dispatching, transition application,
//! event broadcast.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;

use crate::proxy::ProxyPool;
use crate::publish::Publisher;
use crate::worker::{self, WorkerContext, WorkerReport};

use super::super::events::QueueEvent;
use super::super::store::JobStore;
use super::super::types::{bounded_error, JobId, ResultPayload};
use super::{validate_link, Command, CoordinatorConfig, CredentialCheck, SubmitError, Submission};

/// Outcome of a spawned publish task, routed back into the actor.
struct PublishDone {
    job_id: JobId,
    result: ResultPayload,
    error: Option<String>,
}

pub(super) fn spawn(
    store: JobStore,
    cfg: CoordinatorConfig,
    proxies: ProxyPool,
    publisher: Option<Arc<dyn Publisher>>,
    credential_check: Option<Arc<dyn CredentialCheck>>,
    events: broadcast::Sender<QueueEvent>,
    cmd_rx: mpsc::Receiver<Command>,
) {
    let (worker_tx, worker_rx) = mpsc::channel(64);
    let (publish_tx, publish_rx) = mpsc::channel(16);
    let actor = Actor {
        store,
        cfg,
        proxies,
        publisher,
        credential_check,
        events,
        cmd_rx,
        worker_tx,
        worker_rx,
        publish_tx,
        publish_rx,
        workers: JoinSet::new(),
        shutting_down: false,
    };
    tokio::spawn(actor.run());
}

struct Actor {
    store: JobStore,
    cfg: CoordinatorConfig,
    proxies: ProxyPool,
    publisher: Option<Arc<dyn Publisher>>,
    credential_check: Option<Arc<dyn CredentialCheck>>,
    events: broadcast::Sender<QueueEvent>,
    cmd_rx: mpsc::Receiver<Command>,
    worker_tx: mpsc::Sender<WorkerReport>,
    worker_rx: mpsc::Receiver<WorkerReport>,
    publish_tx: mpsc::Sender<PublishDone>,
    publish_rx: mpsc::Receiver<PublishDone>,
    workers: JoinSet<()>,
    shutting_down: bool,
}

impl Actor {
    async fn run(mut self) {
        loop {
            if !self.shutting_down {
                if let Err(e) = self.dispatch().await {
                    tracing::error!("dispatch: {:#}", e);
                }
            }
            if self.shutting_down && self.workers.is_empty() {
                break;
            }

            tokio::select! {
                cmd = self.cmd_rx.recv(), if !self.shutting_down => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => self.shutting_down = true,
                },
                Some(report) = self.worker_rx.recv() => self.handle_report(report).await,
                Some(done) = self.publish_rx.recv() => self.handle_publish_done(done).await,
                Some(res) = self.workers.join_next(), if !self.workers.is_empty() => {
                    if let Err(e) = res {
                        tracing::error!("worker task join: {}", e);
                    }
                }
            }
        }
        tracing::debug!("coordinator actor stopped");
    }

    /// Claims queued jobs in FIFO order while worker capacity is available.
    async fn dispatch(&mut self) -> anyhow::Result<()> {
        while self.workers.len() < self.cfg.max_workers {
            let Some(job_id) = self.store.claim_next_queued().await? else {
                break;
            };
            let Some(job) = self.store.get_job(job_id).await? else {
                // Removed between claim and fetch; nothing to run.
                continue;
            };
            self.emit(QueueEvent::Processing { job_id });

            let ctx = WorkerContext {
                proxy: self.proxies.next(),
                download_dir: self.cfg.download_dir.clone(),
                scrape_timeout: self.cfg.scrape_timeout,
                download_timeout: self.cfg.download_timeout,
                allow_loopback_sources: self.cfg.allow_loopback_sources,
            };
            tracing::info!(job_id, link = %job.source_link, "dispatching job");
            self.workers
                .spawn(worker::run(job_id, job.source_link, ctx, self.worker_tx.clone()));
        }
        Ok(())
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Submit { submission, reply } => {
                let _ = reply.send(self.handle_submit(submission).await);
            }
            Command::Remove { job_id, reply } => {
                let removed = match self.store.remove_job(job_id).await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::error!(job_id, "remove: {:#}", e);
                        false
                    }
                };
                if removed {
                    self.emit(QueueEvent::Removed { job_id });
                }
                let _ = reply.send(removed);
            }
            Command::Requeue { job_id, reply } => {
                let requeued = match self.store.requeue(job_id).await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::error!(job_id, "requeue: {:#}", e);
                        false
                    }
                };
                if requeued {
                    self.emit(QueueEvent::Requeued { job_id });
                }
                let _ = reply.send(requeued);
            }
            Command::Snapshot { reply } => {
                let jobs = match self.store.list_jobs().await {
                    Ok(jobs) => jobs,
                    Err(e) => {
                        tracing::error!("snapshot: {:#}", e);
                        Vec::new()
                    }
                };
                let _ = reply.send(jobs);
            }
        }
    }

    async fn handle_submit(&mut self, submission: Submission) -> Result<JobId, SubmitError> {
        if let Some(check) = &self.credential_check {
            if !check.authorize(submission.credential.as_deref()) {
                return Err(SubmitError::Unauthorized);
            }
        }
        validate_link(&submission.source_link, &self.cfg.allowed_hosts)?;

        let id = self
            .store
            .add_job(&submission.source_link, submission.destination)
            .await
            .map_err(|e| {
                tracing::error!("add job: {:#}", e);
                SubmitError::Closed
            })?;
        match self.store.get_job(id).await {
            Ok(Some(job)) => self.emit(QueueEvent::Added { job }),
            Ok(None) => {}
            Err(e) => tracing::error!(job_id = id, "fetch added job: {:#}", e),
        }
        tracing::info!(job_id = id, link = %submission.source_link, "job accepted");
        Ok(id)
    }

    async fn handle_report(&mut self, report: WorkerReport) {
        match report {
            WorkerReport::ScrapeOk { job_id, .. } => {
                if self.apply(self.store.mark_downloading(job_id).await, job_id) {
                    self.emit(QueueEvent::Downloading { job_id });
                }
            }
            WorkerReport::DownloadOk {
                job_id,
                metadata,
                file_path,
            } => {
                let result = ResultPayload {
                    file_path: file_path.display().to_string(),
                    video_url: metadata.video_url,
                    title: metadata.title,
                    tags: metadata.tags,
                    thumbnail_url: metadata.thumbnail_url,
                };
                match &self.publisher {
                    Some(publisher) => {
                        let destination = match self.store.get_job(job_id).await {
                            Ok(Some(job)) => job.destination,
                            _ => {
                                tracing::debug!(job_id, "discarding late report: job removed");
                                return;
                            }
                        };
                        if !self.apply(self.store.mark_uploading(job_id).await, job_id) {
                            return;
                        }
                        self.emit(QueueEvent::Uploading { job_id });

                        let publisher = Arc::clone(publisher);
                        let publish_tx = self.publish_tx.clone();
                        tokio::spawn(async move {
                            let error = publisher
                                .publish(job_id, &result, destination)
                                .await
                                .err()
                                .map(|e| format!("publish failed: {:#}", e));
                            let _ = publish_tx
                                .send(PublishDone {
                                    job_id,
                                    result,
                                    error,
                                })
                                .await;
                        });
                    }
                    None => {
                        if self.apply(self.store.mark_completed(job_id, &result).await, job_id) {
                            self.emit(QueueEvent::Completed { job_id, result });
                        }
                    }
                }
            }
            WorkerReport::Failed { job_id, error } => {
                let error = bounded_error(&error);
                if self.apply(self.store.mark_failed(job_id, &error).await, job_id) {
                    self.emit(QueueEvent::Failed { job_id, error });
                }
            }
        }
    }

    async fn handle_publish_done(&mut self, done: PublishDone) {
        match done.error {
            None => {
                if self.apply(
                    self.store.mark_completed(done.job_id, &done.result).await,
                    done.job_id,
                ) {
                    self.emit(QueueEvent::Completed {
                        job_id: done.job_id,
                        result: done.result,
                    });
                }
            }
            Some(error) => {
                let error = bounded_error(&error);
                if self.apply(self.store.mark_failed(done.job_id, &error).await, done.job_id) {
                    self.emit(QueueEvent::Failed {
                        job_id: done.job_id,
                        error,
                    });
                }
            }
        }
    }

    /// Unwraps a guarded transition. False means the job was removed or the
    /// report is stale; such events are discarded, never errors.
    fn apply(&self, outcome: anyhow::Result<bool>, job_id: JobId) -> bool {
        match outcome {
            Ok(true) => true,
            Ok(false) => {
                tracing::debug!(job_id, "discarding stale transition");
                false
            }
            Err(e) => {
                tracing::error!(job_id, "transition: {:#}", e);
                false
            }
        }
    }

    fn emit(&self, event: QueueEvent) {
        // Send fails only when nobody subscribes; that is fine.
        let _ = self.events.send(event);
    }
}

