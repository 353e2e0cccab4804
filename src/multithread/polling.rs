//! Polling-based training progress monitoring
//!
//! This module provides a way to monitor a training job's progress through
//! polling. The computation engine publishes a new loss value at every
//! iteration, and clients only look at the latest snapshot when they ask for
//! the job status, so a lock-free triple buffer lets the engine write without
//! ever waiting for a reader.
//!
//! Every job owns its own progress channel, so a snapshot can always be
//! attributed to the job which produced it.

use serde::Serialize;
use triple_buffer::{Input, Output, TripleBuffer};


/// Snapshot of a training job's progress
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Progress {
    /// Most recently reported loss
    pub loss: f64,

    /// Every loss reported so far, in reporting order
    pub loss_history: Vec<f64>,
}


/// Progress channel of a training job
pub struct ProgressChannel {
    /// Server interface used to submit progress updates
    server: ProgressServer,

    /// Client interface used to read the latest progress snapshot
    client: ProgressClient,
}
//
impl ProgressChannel {
    /// Create a new progress channel, starting with no reported loss
    pub fn new() -> Self {
        // Setup triple buffer-based client/server communication...
        let initial = Progress::default();
        let (buf_input, buf_output) = TripleBuffer::new(&initial).split();

        // ...then build the client and server
        ProgressChannel {
            server: ProgressServer { buf_input, current: initial },
            client: ProgressClient { buf_output },
        }
    }

    /// Split the progress channel into server and client objects, which are
    /// respectively sent to the job thread and kept in the job registry
    pub fn split(self) -> (ProgressServer, ProgressClient) {
        (self.server, self.client)
    }
}
//
impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new()
    }
}


/// Server interface, used by the job thread to report progress
pub struct ProgressServer {
    /// New progress snapshots will be sent through this triple buffer
    buf_input: Input<Progress>,

    /// Latest progress, kept around so that the history can grow
    current: Progress,
}
//
impl ProgressServer {
    /// Report the loss of a new training iteration
    pub fn report_loss(&mut self, loss: f64) {
        self.current.loss = loss;
        self.current.loss_history.push(loss);
        self.buf_input.write(self.current.clone());
    }

    /// Latest progress, as seen by the job thread
    pub fn current(&self) -> &Progress {
        &self.current
    }
}


/// Client interface, used to read the latest progress snapshot
pub struct ProgressClient {
    /// Current progress will be read through this triple buffer
    buf_output: Output<Progress>,
}
//
impl ProgressClient {
    /// Access the latest progress snapshot
    pub fn progress(&mut self) -> &Progress {
        self.buf_output.read()
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;

    /// Does the client give out an empty snapshot initially?
    #[test]
    fn initial_state() {
        let (server, mut client) = ProgressChannel::new().split();
        assert_eq!(*client.progress(), Progress::default());
        assert_eq!(*server.current(), Progress::default());
    }

    /// Check that losses propagate from server to client with their history
    #[test]
    fn loss_propagation() {
        let (mut server, mut client) = ProgressChannel::new().split();
        server.report_loss(0.9);
        server.report_loss(0.5);
        server.report_loss(0.25);

        let progress = client.progress();
        assert_eq!(progress.loss, 0.25);
        assert_eq!(progress.loss_history, vec![0.9, 0.5, 0.25]);
    }
}
