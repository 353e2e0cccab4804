//! Facilities to represent the status of training jobs
//!
//! Any training job can be represented as a state machine which starts in a
//! pending state when it is registered, switches to a running state once its
//! background thread has handed control to the computation engine, and finally
//! ends up in a successful or unsuccessful final state.
//!
//! The coarse lifecycle reported to clients is always derived from this state
//! machine, so that it cannot drift away from what the job is actually doing.

use crate::engine::EngineOutput;
use serde::Serialize;
use std::fmt;


/// Representation of a training job's status
///
/// Here are the possible state transitions:
///
/// - Pending -> Running / Cancelled / Error
/// - Running -> Done / Cancelled / Error
///
/// Once the job is in either of the Done, Cancelled or Error state, its state
/// won't change anymore.
///
#[derive(Clone, Debug, PartialEq)]
pub enum JobStatus {
    /// The job has been registered, but its thread has not started the
    /// computation engine yet
    Pending,

    /// The computation engine is processing the job
    Running,

    /// The computation engine has returned. The completion code may still
    /// denote a failure, which is the engine's business.
    Done(EngineOutput),

    /// Cancellation was requested and the job acknowledged it. No output is
    /// available if the job was cancelled before the engine got to run.
    Cancelled(Option<EngineOutput>),

    /// The job could not reach a final status on its own
    Error(JobFailure),
}
//
impl JobStatus {
    /// Coarse lifecycle of the job, as reported to clients
    pub fn lifecycle(&self) -> Lifecycle {
        use self::JobStatus::*;
        match *self {
            Pending => Lifecycle::NotStarted,
            Running => Lifecycle::Running,
            Done(_) | Cancelled(_) | Error(_) => Lifecycle::Finished,
        }
    }

    /// Output of the computation engine, if it ever returned
    pub fn output(&self) -> Option<&EngineOutput> {
        match *self {
            JobStatus::Done(ref output) => Some(output),
            JobStatus::Cancelled(ref output) => output.as_ref(),
            _ => None,
        }
    }
}


/// Check if a job status is final (i.e. won't change anymore)
pub fn is_final(s: &JobStatus) -> bool {
    use self::JobStatus::*;
    match *s {
        Pending | Running => false,
        Done(_) | Cancelled(_) | Error(_) => true,
    }
}


/// Reasons why a job can end up in the Error state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobFailure {
    /// The job's thread went away (typically because the computation engine
    /// panicked) before publishing a final status
    EngineKilled,
}
//
impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            JobFailure::EngineKilled => {
                write!(f, "the computation engine was killed")
            }
        }
    }
}


/// Coarse lifecycle of a training job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    NotStarted,
    Running,
    Finished,
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOutput;

    /// Check which statuses are final and how they map to lifecycles
    #[test]
    fn finality_and_lifecycle() {
        let done = JobStatus::Done(EngineOutput::new(0));
        let cancelled = JobStatus::Cancelled(None);
        let killed = JobStatus::Error(JobFailure::EngineKilled);

        assert!(!is_final(&JobStatus::Pending));
        assert!(!is_final(&JobStatus::Running));
        assert!(is_final(&done));
        assert!(is_final(&cancelled));
        assert!(is_final(&killed));

        assert_eq!(JobStatus::Pending.lifecycle(), Lifecycle::NotStarted);
        assert_eq!(JobStatus::Running.lifecycle(), Lifecycle::Running);
        assert_eq!(done.lifecycle(), Lifecycle::Finished);
        assert_eq!(cancelled.lifecycle(), Lifecycle::Finished);
        assert_eq!(killed.lifecycle(), Lifecycle::Finished);
    }

    /// Only statuses reached after the engine returned carry an output
    #[test]
    fn output_access() {
        let output = EngineOutput::new(7);
        assert_eq!(JobStatus::Done(output.clone()).output(), Some(&output));
        assert_eq!(
            JobStatus::Cancelled(Some(output.clone())).output(),
            Some(&output)
        );
        assert_eq!(JobStatus::Cancelled(None).output(), None);
        assert_eq!(JobStatus::Running.output(), None);
    }
}
