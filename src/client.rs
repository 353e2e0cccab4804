//! Minimal training job client interface
//!
//! However a client has chosen to monitor a training job, one service which is
//! common to all job clients is the ability to request its cancellation.
//!
//! Cancellation is cooperative: the computation engine cannot be preempted,
//! so all we can guarantee is that the engine is able to check at any time
//! whether a cancellation request has been sent for the job it is running.
//! Each job carries its own request flag, so cancelling one job never disturbs
//! another job running against the same engine.
//!
//! Engines are expected to check this flag between iterations of their inner
//! loop, and to return early whenever it is set.


/// Features which all training job clients are expected to share
pub trait IJobClient {
    /// Request the cancellation of the training job
    fn cancel(&mut self);
}
