//! Computation engine interface
//!
//! The computation engine is the pluggable backend which performs the actual
//! training through one blocking entry point. That entry point receives the
//! job parameters and a per-job context, through which the engine reports its
//! loss values and checks for cancellation requests.

use crate::multithread::blocking::CompletionServer;
use crate::multithread::polling::ProgressServer;
use crate::request::ApiData;


/// Pluggable computation engine
pub trait TrainingEngine: Send + Sync + 'static {
    /// Run a training job to completion
    ///
    /// Implementations should call `ctx.keep_running()` between iterations
    /// and return early once it yields false, otherwise cancelling the job
    /// will block until the training is over.
    ///
    fn train(&self, params: &ApiData, ctx: &mut TrainContext) -> EngineOutput;
}
//
impl<F> TrainingEngine for F
    where F: Fn(&ApiData, &mut TrainContext) -> EngineOutput
             + Send + Sync + 'static
{
    fn train(&self, params: &ApiData, ctx: &mut TrainContext) -> EngineOutput {
        self(params, ctx)
    }
}


/// What the computation engine hands back once it is done
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineOutput {
    /// Completion code, 0 means success
    pub code: i32,

    /// Engine-specific result payload
    pub result: ApiData,
}
//
impl EngineOutput {
    /// Output with a completion code and an empty result payload
    pub fn new(code: i32) -> Self {
        EngineOutput { code, result: ApiData::new() }
    }

    /// Output with a completion code and a result payload
    pub fn with_result(code: i32, result: ApiData) -> Self {
        EngineOutput { code, result }
    }

    /// Whether the engine reported success
    pub fn succeeded(&self) -> bool {
        self.code == 0
    }
}


/// Per-job view of the job machinery, as exposed to the computation engine
pub struct TrainContext<'a> {
    /// Job status publisher, only used to check for cancellation here
    server: &'a CompletionServer,

    /// Progress publisher
    progress: &'a mut ProgressServer,
}
//
impl<'a> TrainContext<'a> {
    pub(crate) fn new(server: &'a CompletionServer,
                      progress: &'a mut ProgressServer) -> Self {
        TrainContext { server, progress }
    }

    /// False once cancellation of this job has been requested
    pub fn keep_running(&self) -> bool {
        !self.server.cancelled()
    }

    /// Report the loss of a new training iteration
    pub fn report_loss(&mut self, loss: f64) {
        self.progress.report_loss(loss);
    }

    /// Most recently reported loss, 0 if none was reported yet
    pub fn loss(&self) -> f64 {
        self.progress.current().loss
    }

    /// Every loss reported so far
    pub fn loss_history(&self) -> &[f64] {
        &self.progress.current().loss_history
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::IJobClient;
    use crate::multithread::blocking::JobCell;
    use crate::multithread::polling::ProgressChannel;

    fn decaying_engine(_: &ApiData, ctx: &mut TrainContext) -> EngineOutput {
        for i in 1..=4 {
            ctx.report_loss(1.0 / i as f64);
        }
        assert_eq!(ctx.loss(), 0.25);
        assert_eq!(ctx.loss_history().len(), 4);
        EngineOutput::new(0)
    }

    /// Plain functions can serve as engines, and see what they report
    #[test]
    fn function_engine() {
        let (server, _client) = JobCell::new().split();
        let (mut progress, mut progress_client) =
            ProgressChannel::new().split();
        let mut ctx = TrainContext::new(&server, &mut progress);
        assert!(decaying_engine.train(&ApiData::new(), &mut ctx).succeeded());
        assert_eq!(progress_client.progress().loss, 0.25);
    }

    /// Cancellation requests reach the engine through its context
    #[test]
    fn cancellation_is_visible() {
        let (server, mut client) = JobCell::new().split();
        let (mut progress, _progress_client) = ProgressChannel::new().split();
        assert!(TrainContext::new(&server, &mut progress).keep_running());
        client.cancel();
        assert!(!TrainContext::new(&server, &mut progress).keep_running());
    }
}
