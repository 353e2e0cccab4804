//! Request and report data
//!
//! Parameters and results are opaque JSON objects as far as the job machinery
//! is concerned. This module extracts the few fields it does care about from
//! incoming requests, and defines the reports it sends back.

use crate::error::JobError;
use crate::job::JobId;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;


/// Opaque structured key-value container
pub type ApiData = Map<String, Value>;


/// Look up a nested object, treating anything else as an empty object
fn get_obj<'a>(data: &'a ApiData, key: &str) -> Option<&'a ApiData> {
    data.get(key).and_then(Value::as_object)
}

fn get_flag(data: &ApiData, key: &str) -> Result<bool, JobError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(other) => Err(JobError::InvalidRequest(
            format!("`{key}` must be a boolean, got {other}")
        )),
    }
}

/// `parameters.output.<key>`
fn get_output_flag(data: &ApiData, key: &str) -> Result<bool, JobError> {
    match get_obj(data, "parameters").and_then(|p| get_obj(p, "output")) {
        Some(output) => get_flag(output, key),
        None => Ok(false),
    }
}

fn as_object(request: &Value) -> Result<&ApiData, JobError> {
    request.as_object().ok_or_else(|| {
        JobError::InvalidRequest("request must be a JSON object".into())
    })
}

fn get_job_id(data: &ApiData) -> Result<JobId, JobError> {
    data.get("job")
        .and_then(Value::as_u64)
        .filter(|&id| id > 0)
        .map(JobId::from)
        .ok_or_else(|| JobError::InvalidRequest(
            "`job` must be a positive integer".into()
        ))
}


/// Request to start a training job
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainRequest {
    /// Parameters handed over to the computation engine
    pub params: ApiData,

    /// Run on a dedicated job thread instead of the caller's thread
    pub asynchronous: bool,

    /// Include the full loss history in the result
    pub loss_history: bool,
}
//
impl TrainRequest {
    pub fn new(params: ApiData) -> Self {
        TrainRequest { params, ..Default::default() }
    }

    /// Parse a request of the form
    /// `{"async": true, "parameters": {"output": {"loss_hist": true}}, ...}`
    ///
    /// The whole object is handed over to the computation engine.
    ///
    pub fn from_api(request: &Value) -> Result<Self, JobError> {
        let data = as_object(request)?;
        Ok(TrainRequest {
            asynchronous: get_flag(data, "async")?,
            loss_history: get_output_flag(data, "loss_hist")?,
            params: data.clone(),
        })
    }
}


/// Request for the status of an asynchronous training job
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PollRequest {
    pub job: JobId,

    /// How long to wait for the job to finish, zero means no wait
    pub timeout: Duration,

    /// Include the full loss history in the report
    pub loss_history: bool,
}
//
impl PollRequest {
    /// Parse a request of the form `{"job": 1, "timeout": 5, "loss_hist": true}`
    ///
    /// The loss history flag is also accepted under `parameters.output`.
    ///
    pub fn from_api(request: &Value) -> Result<Self, JobError> {
        let data = as_object(request)?;
        let timeout = match data.get("timeout") {
            None | Some(Value::Null) => 0,
            Some(value) => value.as_u64().ok_or_else(|| {
                JobError::InvalidRequest(
                    "`timeout` must be a non-negative number of seconds".into()
                )
            })?,
        };
        Ok(PollRequest {
            job: get_job_id(data)?,
            timeout: Duration::from_secs(timeout),
            loss_history: get_flag(data, "loss_hist")?
                || get_output_flag(data, "loss_hist")?,
        })
    }
}


/// Request for the termination of an asynchronous training job
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeleteRequest {
    pub job: JobId,
}
//
impl DeleteRequest {
    /// Parse a request of the form `{"job": 1}`
    pub fn from_api(request: &Value) -> Result<Self, JobError> {
        Ok(DeleteRequest { job: get_job_id(as_object(request)?)? })
    }
}


/// Outcome of a training request
#[derive(Clone, Debug, PartialEq)]
pub enum TrainOutcome {
    /// Synchronous training is over
    Completed {
        /// Completion code of the computation engine
        code: i32,

        /// Engine result, augmented with `loss` and possibly `loss_hist`
        result: ApiData,
    },

    /// Asynchronous training was started
    Launched(JobId),
}


/// Job status as reported by a poll
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PollStatus {
    #[serde(rename = "running")]
    Running,
    #[serde(rename = "finished")]
    Finished,
    #[serde(rename = "unknown error")]
    UnknownError,
}
//
impl PollStatus {
    /// Whether no further progress will be reported for the job
    pub fn is_terminal(self) -> bool {
        self != PollStatus::Running
    }
}


/// Answer to a job status request
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PollReport {
    pub status: PollStatus,

    /// Latest loss reported by this job
    pub loss: f64,

    /// Whole seconds since the job was started
    #[serde(rename = "time")]
    pub elapsed_secs: u64,

    #[serde(rename = "loss_hist", skip_serializing_if = "Option::is_none")]
    pub loss_history: Option<Vec<f64>>,

    /// Engine result, only available once the engine has returned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ApiData>,
}


/// Job status as reported by a termination request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CancelStatus {
    /// The job was running and acknowledged the request
    #[serde(rename = "terminated")]
    Terminated,

    /// The job was not running anymore, nothing was signalled
    #[serde(rename = "not started")]
    NotStarted,
}


/// Answer to a job termination request
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CancelReport {
    pub status: CancelStatus,

    /// Whole seconds since the job was started, for terminated jobs
    #[serde(rename = "time", skip_serializing_if = "Option::is_none")]
    pub elapsed_secs: Option<u64>,
}
