//! Blocking-based training job completion
//!
//! This module provides a way to wait for a training job to reach its final
//! status, with a bounded wait. It is the channel through which a job's
//! terminal outcome travels from its background thread to the job registry.
//!
//! The terminal outcome can only be extracted by consuming the client, which
//! guarantees that it is read at most once.

use crate::client::IJobClient;
use crate::server::{GenericJobServer, JobServerConfig};
use crate::status::{self, JobStatus, Lifecycle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;


/// Completion cell of a training job
pub struct JobCell {
    /// Server interface used to submit status updates
    server: CompletionServer,

    /// Client interface used to wait for the final status
    client: CompletionClient,
}
//
impl JobCell {
    /// Create a new completion cell for a pending job
    pub fn new() -> Self {
        // Start by building the shared state...
        let shared_state = Arc::new(
            SharedState {
                status_lock: Mutex::new(JobStatus::Pending),
                update_cv: Condvar::new(),
                cancelled: AtomicBool::new(false),
            }
        );

        // ...then build the client and server
        JobCell {
            server: GenericJobServer::new(
                BlockingServerConfig { shared: shared_state.clone() },
                &JobStatus::Pending
            ),
            client: CompletionClient { shared: shared_state },
        }
    }

    /// Split the completion cell into server and client objects, which are
    /// respectively sent to the job thread and kept in the job registry
    pub fn split(self) -> (CompletionServer, CompletionClient) {
        (self.server, self.client)
    }
}
//
impl Default for JobCell {
    fn default() -> Self {
        Self::new()
    }
}


/// Server interface, used to send job status updates to the client
pub type CompletionServer = GenericJobServer<BlockingServerConfig>;


/// Server configuration for blocking job monitoring
pub struct BlockingServerConfig {
    /// Reference-counted shared state
    shared: Arc<SharedState>,
}
//
impl JobServerConfig for BlockingServerConfig {
    /// Method used to send a status update to the client
    fn update(&mut self, status: JobStatus) {
        // Update the value of the job status
        *self.shared.lock_status() = status;

        // Notify the waiters that an update has occured
        self.shared.update_cv.notify_all();
    }

    /// Method used to query whether the client has cancelled the job
    fn cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }
}


/// Client interface, owned by the job registry
pub struct CompletionClient {
    /// Reference-counted shared state
    shared: Arc<SharedState>,
}
//
impl CompletionClient {
    /// Coarse lifecycle of the job right now
    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.lock_status().lifecycle()
    }

    /// Non-blocking check for a final status
    pub fn is_final(&self) -> bool {
        status::is_final(&self.shared.lock_status())
    }

    /// Wait up to `timeout` for the job to reach its final status, and tell
    /// whether it did
    pub fn wait_final(&self, timeout: Duration) -> bool {
        self.shared.wait_final(timeout)
    }

    /// Build a wait-only handle, which can outlive a registry lock
    pub fn waiter(&self) -> CompletionWaiter {
        CompletionWaiter { shared: self.shared.clone() }
    }

    /// Consume the client and extract the job's current status
    ///
    /// Callers should only do this once `is_final()` holds, otherwise they
    /// get a transient status and the job is asked to stop on the way out.
    ///
    pub fn into_final(self) -> JobStatus {
        self.shared.lock_status().clone()
    }
}
//
impl IJobClient for CompletionClient {
    /// Request the cancellation of the training job
    fn cancel(&mut self) {
        self.shared.cancelled.store(true, Ordering::Release);
    }
}
//
impl Drop for CompletionClient {
    /// A job which nobody monitors anymore has no reason to keep running
    fn drop(&mut self) {
        if !self.is_final() {
            self.cancel();
        }
    }
}


/// Wait-only access to a job's completion cell
#[derive(Clone)]
pub struct CompletionWaiter {
    /// Reference-counted shared state
    shared: Arc<SharedState>,
}
//
impl CompletionWaiter {
    /// Wait up to `timeout` for the job to reach its final status, and tell
    /// whether it did
    pub fn wait_final(&self, timeout: Duration) -> bool {
        self.shared.wait_final(timeout)
    }
}


/// State shared between the client and the server
struct SharedState {
    /// Current job status (mutex-protected)
    status_lock: Mutex<JobStatus>,

    /// Condition variable used to notify waiters about status updates
    update_cv: Condvar,

    /// Atomic boolean used by the client to request cancellation
    cancelled: AtomicBool,
}
//
impl SharedState {
    /// Access the current job status
    ///
    /// Status updates are single assignments, so a panic elsewhere cannot
    /// leave the status half-written and poisoning can be ignored.
    ///
    fn lock_status(&self) -> MutexGuard<JobStatus> {
        self.status_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_final(&self, timeout: Duration) -> bool {
        let status_lock = self.lock_status();
        let (status_lock, _) = self.update_cv
            .wait_timeout_while(status_lock, timeout, |s| !status::is_final(s))
            .unwrap_or_else(PoisonError::into_inner);
        status::is_final(&status_lock)
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOutput;
    use crate::status::JobFailure;
    use std::thread;
    use std::time::Instant;

    /// Check the initial state of completion cells
    #[test]
    fn initial_state() {
        let (server, client) = JobCell::new().split();
        assert_eq!(client.lifecycle(), Lifecycle::NotStarted);
        assert!(!client.is_final());
        assert!(!server.cancelled());
        assert!(!client.wait_final(Duration::from_secs(0)));
    }

    /// Check that status updates propagate from server to client
    #[test]
    fn status_propagation() {
        let (mut server, client) = JobCell::new().split();
        server.update(JobStatus::Running);
        assert_eq!(client.lifecycle(), Lifecycle::Running);

        server.update(JobStatus::Done(EngineOutput::new(0)));
        assert!(client.is_final());
        assert_eq!(client.into_final(), JobStatus::Done(EngineOutput::new(0)));
    }

    /// Check that a bounded wait times out on a job that does not finish
    #[test]
    fn wait_timeout() {
        let (mut server, client) = JobCell::new().split();
        server.update(JobStatus::Running);

        let start = Instant::now();
        assert!(!client.wait_final(Duration::from_millis(100)));
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert_eq!(client.lifecycle(), Lifecycle::Running);
    }

    /// Check that waiters are woken up by the final status update
    #[test]
    fn wait_wakeup() {
        let (mut server, client) = JobCell::new().split();
        let waiter = client.waiter();

        let worker = thread::spawn(move || {
            server.update(JobStatus::Running);
            thread::sleep(Duration::from_millis(50));
            server.update(JobStatus::Done(EngineOutput::new(3)));
        });

        assert!(waiter.wait_final(Duration::from_secs(10)));
        worker.join().unwrap();
        assert_eq!(client.into_final(), JobStatus::Done(EngineOutput::new(3)));
    }

    /// Check that cancellation works as expected
    #[test]
    fn cancellation() {
        let (server, mut client) = JobCell::new().split();
        client.cancel();
        assert!(server.cancelled());
    }

    /// Dropping a live client asks the job to stop
    #[test]
    fn orphaned_job_is_cancelled() {
        let (mut server, client) = JobCell::new().split();
        server.update(JobStatus::Running);
        drop(client);
        assert!(server.cancelled());
    }

    /// Dropping the server mid-flight releases the waiters
    #[test]
    fn killed_server() {
        let (mut server, client) = JobCell::new().split();
        server.update(JobStatus::Running);
        drop(server);
        assert!(client.wait_final(Duration::from_secs(0)));
        assert_eq!(
            client.into_final(),
            JobStatus::Error(JobFailure::EngineKilled)
        );
    }
}
