//! Errors reported by the training job service

use crate::job::JobId;
use std::time::Duration;


#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Training job not found: {0}")]
    NotFound(JobId),

    #[error("Training job {job} did not acknowledge cancellation within {waited:?}")]
    CancellationTimedOut { job: JobId, waited: Duration },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to spawn training job thread: {0}")]
    Spawn(#[source] std::io::Error),
}
