//! Multithreaded training job monitoring
//!
//! Every asynchronous training job runs on a dedicated OS thread, and is
//! monitored by its clients through two channels:
//!
//! - Blocking is used for the job's completion: clients may wait, with a
//!   bounded timeout, for the job to reach its final status, and the final
//!   outcome is handed out at most once.
//! - Polling is used for the job's progress: the computation engine
//!   publishes its loss values without ever waiting for a client, and clients
//!   only look at the latest snapshot when they ask for it.


pub mod blocking;
pub mod polling;
