//! Training job monitoring
//!
//! Picture yourself in a situation where: you have a computation engine which
//! trains a model through a single blocking call, and which may take hours to
//! return. Some clients are happy to block until it is done, but most would
//! rather launch the training, go do something else, and come back later to
//! check on its progress, collect its result, or change their mind and stop it
//! early. And several of them may be doing so at the same time.
//!
//! This crate turns such a blocking call into a trackable, cancellable unit of
//! work identified by an integer handle:
//!
//! - Every asynchronous job runs on its own OS thread, and owns its own
//!   cancellation flag and progress snapshot, so jobs never step on each
//!   other's toes even when they share a computation engine.
//! - Jobs are tracked by a mutex-guarded registry, which is never locked
//!   while a client waits for a job to finish.
//! - The terminal outcome of a job travels through a one-shot channel which
//!   is consumed, together with the job's registry record, by exactly one
//!   status request.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod multithread;
pub mod registry;
pub mod request;
pub mod server;
pub mod service;
pub mod status;

pub use config::ServiceConfig;
pub use engine::{EngineOutput, TrainContext, TrainingEngine};
pub use error::JobError;
pub use job::JobId;
pub use request::{ApiData, PollReport, CancelReport, TrainOutcome, TrainRequest};
pub use service::TrainingService;
