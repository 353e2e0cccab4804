//! Training service configuration

use serde::Serialize;
use std::env;
use std::time::Duration;


/// Static configuration of a training service
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Optional description of the service
    pub description: String,

    /// Name of the computation engine behind the service
    pub mllib: String,

    /// How long a termination request may wait for a job to acknowledge
    /// its cancellation
    pub cancel_timeout: Duration,

    /// Upper bound on the wait of a single status request
    pub max_poll_wait: Duration,
}
//
impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            name: "train".into(),
            description: String::new(),
            mllib: "unknown".into(),
            cancel_timeout: Duration::from_secs(300),
            max_poll_wait: Duration::from_secs(3600),
        }
    }
}
//
impl ServiceConfig {
    /// Build a configuration from `TRAIN_JOBS_*` environment variables,
    /// falling back to the defaults for missing or malformed values
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
        where F: Fn(&str) -> Option<String>
    {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            match lookup(key).map(|raw| raw.trim().parse::<u64>()) {
                Some(Ok(secs)) => Duration::from_secs(secs),
                Some(Err(e)) => {
                    tracing::warn!(key, error = %e, "ignoring malformed setting");
                    default
                }
                None => default,
            }
        };

        ServiceConfig {
            cancel_timeout: secs("TRAIN_JOBS_CANCEL_TIMEOUT_SECS",
                                 defaults.cancel_timeout),
            max_poll_wait: secs("TRAIN_JOBS_MAX_POLL_WAIT_SECS",
                                defaults.max_poll_wait),
            name: lookup("TRAIN_JOBS_NAME").unwrap_or(defaults.name),
            description: lookup("TRAIN_JOBS_DESCRIPTION")
                .unwrap_or(defaults.description),
            mllib: lookup("TRAIN_JOBS_MLLIB").unwrap_or(defaults.mllib),
        }
    }
}
