//! General implementation of a training job server
//!
//! The server is the half of a training job which lives on the job's own
//! background thread. It publishes status updates to whoever monitors the job,
//! and lets the computation engine check whether the job was cancelled.
//!
//! Note that this raw abstraction is only handed to the computation engine
//! through a restricted context, as letting the engine publish arbitrary status
//! updates would allow it to break the job state machine.

use crate::status::{self, JobFailure, JobStatus};


/// Server interface, used to submit job status updates
pub struct GenericJobServer<Config: JobServerConfig> {
    /// User-configurable server behaviour
    config: Config,

    /// Flag indicating that the job status has reached a final state and
    /// should not change anymore
    reached_final_status: bool,
}
//
impl<Config: JobServerConfig> GenericJobServer<Config> {
    /// Create a new server interface with some initial status
    pub fn new(config: Config, initial_status: &JobStatus) -> Self {
        GenericJobServer {
            config,
            reached_final_status: status::is_final(initial_status),
        }
    }

    /// Update the current status of the training job
    pub fn update(&mut self, status: JobStatus) {
        // This should only happen if we have not yet reached a final status
        debug_assert!(!self.reached_final_status);
        self.reached_final_status = status::is_final(&status);

        // Propagate the new job status
        self.config.update(status);
    }

    /// Check whether the client has requested the job's cancellation
    pub fn cancelled(&self) -> bool {
        self.config.cancelled()
    }
}
//
impl<Config: JobServerConfig> Drop for GenericJobServer<Config> {
    /// If the server is killed before the job has reached its final status,
    /// notify the client in order to prevent it from hanging
    fn drop(&mut self) {
        if !self.reached_final_status {
            self.update(JobStatus::Error(JobFailure::EngineKilled));
        }
    }
}


/// Configurable parameters of GenericJobServer
pub trait JobServerConfig {
    /// Method used to send status updates to the client
    fn update(&mut self, status: JobStatus);

    /// Method used to query whether the client has cancelled the job
    fn cancelled(&self) -> bool;
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOutput;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Server configuration which records every update it receives
    struct RecordingConfig {
        updates: Rc<RefCell<Vec<JobStatus>>>,
        cancelled: bool,
    }
    //
    impl JobServerConfig for RecordingConfig {
        fn update(&mut self, status: JobStatus) {
            self.updates.borrow_mut().push(status);
        }

        fn cancelled(&self) -> bool {
            self.cancelled
        }
    }

    fn recording_server(
        cancelled: bool
    ) -> (GenericJobServer<RecordingConfig>, Rc<RefCell<Vec<JobStatus>>>) {
        let updates = Rc::new(RefCell::new(Vec::new()));
        let server = GenericJobServer::new(
            RecordingConfig { updates: updates.clone(), cancelled },
            &JobStatus::Pending
        );
        (server, updates)
    }

    /// A server which reached a final status does not complain when dropped
    #[test]
    fn clean_shutdown() {
        let (mut server, updates) = recording_server(false);
        server.update(JobStatus::Running);
        server.update(JobStatus::Done(EngineOutput::new(0)));
        drop(server);
        assert_eq!(*updates.borrow(), vec![
            JobStatus::Running,
            JobStatus::Done(EngineOutput::new(0)),
        ]);
    }

    /// A server dropped mid-flight reports that the engine was killed
    #[test]
    fn killed_server() {
        let (mut server, updates) = recording_server(false);
        server.update(JobStatus::Running);
        drop(server);
        assert_eq!(
            updates.borrow().last(),
            Some(&JobStatus::Error(JobFailure::EngineKilled))
        );
    }

    /// Cancellation queries are forwarded to the configuration
    #[test]
    fn cancellation_query() {
        let (server, _updates) = recording_server(true);
        assert!(server.cancelled());
        let (server, _updates) = recording_server(false);
        assert!(!server.cancelled());
    }
}
