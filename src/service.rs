//! Training service
//!
//! The training service exposes a blocking computation engine through a
//! uniform job interface. Callers can either run a training job synchronously
//! and block for its result, or launch it asynchronously on a dedicated job
//! thread, then poll it for progress, retrieve its result once it is over, or
//! request its early termination.
//!
//! Asynchronous jobs are tracked by the service's job registry until their
//! terminal status has been reported once. Dropping the service drops the
//! outstanding job records, which asks their jobs to stop without waiting for
//! them; use `shutdown()` to wait for them.

use crate::config::ServiceConfig;
use crate::engine::{EngineOutput, TrainingEngine};
use crate::error::JobError;
use crate::job::{self, JobId, JobRecord, ReapedJob};
use crate::multithread::blocking::JobCell;
use crate::multithread::polling::ProgressChannel;
use crate::registry::JobRegistry;
use crate::request::{
    CancelReport, CancelStatus, PollReport, PollStatus, TrainOutcome,
    TrainRequest,
};
use crate::status::{JobStatus, Lifecycle};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};


/// Static description of a training service
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub description: String,
    pub mllib: String,
}


/// Outstanding job, as listed by `TrainingService::status()`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobSummary {
    pub job: JobId,
    pub lifecycle: Lifecycle,
    pub started_at: DateTime<Utc>,
}


/// Description of a training service and of its outstanding jobs
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceStatus {
    #[serde(flatten)]
    pub info: ServiceInfo,
    pub jobs: Vec<JobSummary>,
}


/// Map a job's status to the status reported by polls
///
/// Whenever the engine returned, its completion code decides, even if the
/// job was asked to stop meanwhile.
///
fn poll_status(status: &JobStatus) -> PollStatus {
    match status.output() {
        Some(output) if output.succeeded() => PollStatus::Finished,
        Some(_) => PollStatus::UnknownError,
        None if crate::status::is_final(status) => PollStatus::UnknownError,
        None => PollStatus::Running,
    }
}


/// Training service wrapping a computation engine
pub struct TrainingService<E: TrainingEngine> {
    config: ServiceConfig,
    engine: Arc<E>,
    registry: JobRegistry,
}
//
impl<E: TrainingEngine> TrainingService<E> {
    pub fn new(config: ServiceConfig, engine: E) -> Self {
        TrainingService {
            config,
            engine: Arc::new(engine),
            registry: JobRegistry::new(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Static description of the service
    pub fn info(&self) -> ServiceInfo {
        ServiceInfo {
            name: self.config.name.clone(),
            description: self.config.description.clone(),
            mllib: self.config.mllib.clone(),
        }
    }

    /// Description of the service and of its outstanding jobs
    pub fn status(&self) -> ServiceStatus {
        let mut jobs: Vec<JobSummary> = self.registry
            .lock()
            .values()
            .map(|job| JobSummary {
                job: job.id(),
                lifecycle: job.lifecycle(),
                started_at: job.started_at(),
            })
            .collect();
        jobs.sort_by_key(|summary| summary.job);
        ServiceStatus { info: self.info(), jobs }
    }

    /// Identifiers of the outstanding asynchronous jobs
    pub fn jobs(&self) -> Vec<JobId> {
        self.registry.ids()
    }

    /// Start a training job
    ///
    /// Synchronous jobs run on the caller's thread and report the engine's
    /// completion code, along with its result augmented with the final loss
    /// (and the loss history if requested). Asynchronous jobs are launched on
    /// a dedicated thread, and their identifier is returned immediately.
    ///
    pub fn train(&self, request: &TrainRequest) -> Result<TrainOutcome, JobError> {
        if !request.asynchronous {
            return Ok(self.train_sync(request));
        }

        let engine = self.engine.clone();
        let params = request.params.clone();
        let id = self.registry.insert_with(move |id| {
            JobRecord::launch(id, engine, params)
        })?;
        info!(job = %id, service = %self.config.name, "training job launched");
        Ok(TrainOutcome::Launched(id))
    }

    fn train_sync(&self, request: &TrainRequest) -> TrainOutcome {
        // The completion cell only serves the engine's context here. The
        // final update below keeps the server from reporting a killed engine.
        let (mut server, _client) = JobCell::new().split();
        let (mut progress, _progress_client) = ProgressChannel::new().split();

        // Nobody else can cancel this job, so the engine always runs
        let output = job::execute(&*self.engine,
                                  &request.params,
                                  &mut server,
                                  &mut progress)
            .unwrap_or_default();
        server.update(JobStatus::Done(output.clone()));

        let EngineOutput { code, mut result } = output;
        let progress = progress.current();
        result.insert("loss".into(), Value::from(progress.loss));
        if request.loss_history {
            result.insert("loss_hist".into(),
                          Value::from(progress.loss_history.clone()));
        }
        info!(service = %self.config.name, code, "synchronous training ended");
        TrainOutcome::Completed { code, result }
    }

    /// Report the status of an asynchronous job, waiting up to `timeout`
    /// for it to finish
    ///
    /// The registry lock is not held during the wait. Once the job has
    /// finished, its record is removed as part of this call: the terminal
    /// status is reported exactly once, and later requests for the same job
    /// fail with `JobError::NotFound`.
    ///
    pub fn job_status(
        &self,
        id: JobId,
        timeout: Duration,
        loss_history: bool,
    ) -> Result<PollReport, JobError> {
        let timeout = timeout.min(self.config.max_poll_wait);
        let waiter = self.registry.with_job(id, |job| job.waiter())?;

        if !waiter.wait_final(timeout) {
            return self.registry.with_job(id, |job| {
                let elapsed_secs = job.elapsed().as_secs();
                let progress = job.progress();
                debug!(job = %id, loss = progress.loss, "training job running");
                PollReport {
                    status: PollStatus::Running,
                    loss: progress.loss,
                    elapsed_secs,
                    loss_history: loss_history
                        .then(|| progress.loss_history.clone()),
                    result: None,
                }
            });
        }

        // A concurrent request may have reaped the job since the wait ended
        let reaped = self.registry.remove(id)?.reap();
        let status = poll_status(&reaped.status);
        info!(job = %id, ?status, "training job reaped");
        Ok(Self::terminal_report(reaped, status, loss_history))
    }

    fn terminal_report(reaped: ReapedJob,
                       status: PollStatus,
                       loss_history: bool) -> PollReport {
        let ReapedJob { status: job_status, progress, elapsed, .. } = reaped;
        let result = match job_status {
            JobStatus::Done(output) | JobStatus::Cancelled(Some(output)) => {
                Some(output.result)
            }
            _ => None,
        };
        PollReport {
            status,
            loss: progress.loss,
            elapsed_secs: elapsed.as_secs(),
            loss_history: if loss_history {
                Some(progress.loss_history)
            } else {
                None
            },
            result,
        }
    }

    /// Terminate an asynchronous job
    ///
    /// If the job is still live, its cancellation is requested and this call
    /// waits, with the registry locked, for the job to acknowledge it. The
    /// wait is bounded by the configured cancellation timeout, past which
    /// `JobError::CancellationTimedOut` is returned and the job is left in
    /// the registry for a later status request to reap.
    ///
    /// Jobs which already ended are reported as "not started", and are also
    /// left in the registry so that their outcome can still be polled.
    ///
    pub fn delete_job(&self, id: JobId) -> Result<CancelReport, JobError> {
        let mut jobs = self.registry.lock();
        let job = jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;

        if job.is_final() {
            debug!(job = %id, "termination requested for an ended job");
            return Ok(CancelReport {
                status: CancelStatus::NotStarted,
                elapsed_secs: None,
            });
        }

        job.request_cancel();
        let waited = self.config.cancel_timeout;
        if !job.waiter().wait_final(waited) {
            warn!(job = %id, ?waited, "training job ignored cancellation");
            return Err(JobError::CancellationTimedOut { job: id, waited });
        }

        let job = jobs.remove(&id).ok_or(JobError::NotFound(id))?;
        drop(jobs);
        let reaped = job.reap();
        info!(job = %id, elapsed = ?reaped.elapsed, "training job terminated");
        Ok(CancelReport {
            status: CancelStatus::Terminated,
            elapsed_secs: Some(reaped.elapsed.as_secs()),
        })
    }

    /// Cancel every outstanding job and wait for them to stop
    ///
    /// Jobs which do not acknowledge cancellation within the configured
    /// timeout are left running detached. Returns the reaped jobs.
    ///
    pub fn shutdown(&self) -> Vec<ReapedJob> {
        let mut jobs = self.registry.drain();
        for job in &mut jobs {
            job.request_cancel();
        }

        let mut reaped = Vec::with_capacity(jobs.len());
        for job in jobs {
            if job.waiter().wait_final(self.config.cancel_timeout) {
                reaped.push(job.reap());
            } else {
                warn!(job = %job.id(), "detaching training job on shutdown");
            }
        }
        info!(service = %self.config.name, jobs = reaped.len(), "service shut down");
        reaped
    }
}
