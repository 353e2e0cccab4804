//! Training job records
//!
//! A job record is the registry's handle to one asynchronous training job: it
//! owns the client side of the job's completion and progress channels, the
//! job thread's join handle, and the job's start time.

use crate::client::IJobClient;
use crate::engine::{EngineOutput, TrainContext, TrainingEngine};
use crate::error::JobError;
use crate::multithread::blocking::{
    CompletionClient, CompletionServer, CompletionWaiter, JobCell,
};
use crate::multithread::polling::{
    Progress, ProgressChannel, ProgressClient, ProgressServer,
};
use crate::request::ApiData;
use crate::status::{JobStatus, Lifecycle};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};


/// Identifier of an asynchronous training job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(u64);
//
impl JobId {
    pub fn get(self) -> u64 {
        self.0
    }
}
//
impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        JobId(id)
    }
}
//
impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}


/// Run the computation engine on the current thread
///
/// Returns None if the job was cancelled before the engine got to run.
///
pub(crate) fn execute<E: TrainingEngine + ?Sized>(
    engine: &E,
    params: &ApiData,
    server: &mut CompletionServer,
    progress: &mut ProgressServer,
) -> Option<EngineOutput> {
    if server.cancelled() {
        return None;
    }
    server.update(JobStatus::Running);
    let mut ctx = TrainContext::new(server, progress);
    Some(engine.train(params, &mut ctx))
}


/// Registry entry of an asynchronous training job
pub struct JobRecord {
    id: JobId,

    /// Completion channel, holds the job's terminal outcome
    completion: CompletionClient,

    /// Progress channel, holds the job's latest loss values
    progress: ProgressClient,

    /// Job thread, joined when the record is reaped
    thread: JoinHandle<()>,

    /// Wall-clock date at which the job was started
    started_at: DateTime<Utc>,

    /// Monotonic date at which the job was started
    started: Instant,
}
//
impl JobRecord {
    /// Spawn a job thread running the computation engine against `params`
    pub fn launch<E: TrainingEngine>(
        id: JobId,
        engine: Arc<E>,
        params: ApiData,
    ) -> Result<Self, JobError> {
        let (mut server, completion) = JobCell::new().split();
        let (mut progress_server, progress) = ProgressChannel::new().split();

        let started_at = Utc::now();
        let started = Instant::now();
        let thread = thread::Builder::new()
            .name(format!("train-job-{id}"))
            .spawn(move || {
                let final_status = match execute(&*engine,
                                                 &params,
                                                 &mut server,
                                                 &mut progress_server) {
                    Some(output) if server.cancelled() => {
                        JobStatus::Cancelled(Some(output))
                    }
                    Some(output) => JobStatus::Done(output),
                    None => JobStatus::Cancelled(None),
                };
                debug!(job = %id, status = ?final_status, "training job ended");
                server.update(final_status);
            })
            .map_err(JobError::Spawn)?;

        Ok(JobRecord {
            id,
            completion,
            progress,
            thread,
            started_at,
            started,
        })
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time elapsed since the job was started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.completion.lifecycle()
    }

    /// Non-blocking check for a final status
    pub fn is_final(&self) -> bool {
        self.completion.is_final()
    }

    /// Latest progress snapshot of this job
    pub fn progress(&mut self) -> &Progress {
        self.progress.progress()
    }

    /// Wait-only handle on the job's completion
    pub fn waiter(&self) -> CompletionWaiter {
        self.completion.waiter()
    }

    /// Ask the computation engine to stop working on this job
    pub fn request_cancel(&mut self) {
        self.completion.cancel();
    }

    /// Consume a finished record, joining its thread and extracting its
    /// terminal outcome
    pub fn reap(mut self) -> ReapedJob {
        debug_assert!(self.is_final());
        let progress = self.progress.progress().clone();
        let elapsed = self.elapsed();
        let status = self.completion.into_final();
        if self.thread.join().is_err() {
            warn!(job = %self.id, "training job thread panicked");
        }
        ReapedJob { id: self.id, status, progress, elapsed }
    }
}
//
impl fmt::Debug for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("JobRecord")
            .field("id", &self.id)
            .field("lifecycle", &self.lifecycle())
            .field("started_at", &self.started_at)
            .finish()
    }
}


/// What remains of a job once its record has been reaped
#[derive(Clone, Debug, PartialEq)]
pub struct ReapedJob {
    pub id: JobId,

    /// Terminal status, read exactly once
    pub status: JobStatus,

    /// Final progress snapshot of this job
    pub progress: Progress,

    /// Time elapsed between the job's start and its reaping
    pub elapsed: Duration,
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::JobFailure;
    use assert_matches::assert_matches;

    fn quick_engine(_: &ApiData, ctx: &mut TrainContext) -> EngineOutput {
        ctx.report_loss(0.5);
        ctx.report_loss(0.125);
        let mut result = ApiData::new();
        result.insert("iterations".into(), 2.into());
        EngineOutput::with_result(0, result)
    }

    fn endless_engine(_: &ApiData, ctx: &mut TrainContext) -> EngineOutput {
        let mut loss = 1.0;
        while ctx.keep_running() {
            loss /= 2.0;
            ctx.report_loss(loss);
            thread::sleep(Duration::from_millis(5));
        }
        EngineOutput::new(0)
    }

    fn panicking_engine(_: &ApiData, _: &mut TrainContext) -> EngineOutput {
        panic!("engine blew up");
    }

    #[test]
    fn launch_and_reap() {
        let mut job = JobRecord::launch(
            JobId::from(1), Arc::new(quick_engine), ApiData::new()
        ).unwrap();
        assert_eq!(job.id(), JobId::from(1));
        assert!(job.waiter().wait_final(Duration::from_secs(10)));
        assert_eq!(job.lifecycle(), Lifecycle::Finished);
        assert_eq!(job.progress().loss, 0.125);

        let reaped = job.reap();
        assert_eq!(reaped.progress.loss_history, vec![0.5, 0.125]);
        let output = reaped.status.output().unwrap();
        assert!(output.succeeded());
        assert_eq!(output.result["iterations"], 2);
    }

    #[test]
    fn cancelled_job() {
        let mut job = JobRecord::launch(
            JobId::from(2), Arc::new(endless_engine), ApiData::new()
        ).unwrap();
        assert!(!job.waiter().wait_final(Duration::from_millis(50)));
        job.request_cancel();
        assert!(job.waiter().wait_final(Duration::from_secs(10)));
        assert_matches!(job.reap().status, JobStatus::Cancelled(_));
    }

    #[test]
    fn panicking_engine_is_reported() {
        let job = JobRecord::launch(
            JobId::from(3), Arc::new(panicking_engine), ApiData::new()
        ).unwrap();
        assert!(job.waiter().wait_final(Duration::from_secs(10)));
        assert_eq!(
            job.reap().status,
            JobStatus::Error(JobFailure::EngineKilled)
        );
    }
}
