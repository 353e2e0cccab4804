//! Registry of outstanding asynchronous training jobs
//!
//! The registry is the sole owner of all job records. Every access to the
//! mapping goes through a single mutex, while job identifiers come from an
//! atomic counter which is never decremented, so identifiers are never reused
//! even after their job is reaped.

use crate::error::JobError;
use crate::job::{JobId, JobRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};


/// Mutex-guarded mapping from job identifiers to job records
pub type JobMap = HashMap<JobId, JobRecord>;


/// Thread-safe registry of job records
#[derive(Debug, Default)]
pub struct JobRegistry {
    /// Last identifier handed out, 0 if none was
    counter: AtomicU64,

    /// Outstanding jobs
    jobs: Mutex<JobMap>,
}
//
impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the job mapping
    ///
    /// Records are only inserted and removed as a whole, so a panic while the
    /// lock is held cannot leave the mapping inconsistent and poisoning can be
    /// ignored.
    ///
    pub fn lock(&self) -> MutexGuard<JobMap> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a fresh identifier, build a record for it and insert it
    ///
    /// The identifier is consumed even if `build` fails.
    ///
    pub fn insert_with<F>(&self, build: F) -> Result<JobId, JobError>
        where F: FnOnce(JobId) -> Result<JobRecord, JobError>
    {
        let mut jobs = self.lock();
        let id = JobId::from(self.counter.fetch_add(1, Ordering::Relaxed) + 1);
        let record = build(id)?;
        jobs.insert(id, record);
        Ok(id)
    }

    /// Run `f` against the record of job `id`, under the registry lock
    pub fn with_job<R, F>(&self, id: JobId, f: F) -> Result<R, JobError>
        where F: FnOnce(&mut JobRecord) -> R
    {
        self.lock()
            .get_mut(&id)
            .map(f)
            .ok_or(JobError::NotFound(id))
    }

    /// Move the record of job `id` out of the registry
    pub fn remove(&self, id: JobId) -> Result<JobRecord, JobError> {
        self.lock().remove(&id).ok_or(JobError::NotFound(id))
    }

    /// Move every record out of the registry
    pub fn drain(&self) -> Vec<JobRecord> {
        self.lock().drain().map(|(_, job)| job).collect()
    }

    /// Identifiers of the outstanding jobs, in increasing order
    pub fn ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineOutput, TrainContext};
    use crate::request::ApiData;
    use assert_matches::assert_matches;
    use std::io;
    use std::sync::Arc;
    use std::time::Duration;

    fn instant_engine(_: &ApiData, _: &mut TrainContext) -> EngineOutput {
        EngineOutput::new(0)
    }

    fn launch(registry: &JobRegistry) -> JobId {
        registry.insert_with(|id| {
            JobRecord::launch(id, Arc::new(instant_engine), ApiData::new())
        }).unwrap()
    }

    /// Identifiers start at 1, increase strictly and are never reused
    #[test]
    fn identifiers_are_never_reused() {
        let registry = JobRegistry::new();
        let first = launch(&registry);
        let second = launch(&registry);
        assert_eq!(first, JobId::from(1));
        assert_eq!(second, JobId::from(2));
        assert_eq!(registry.ids(), vec![first, second]);

        for id in [first, second] {
            let job = registry.remove(id).unwrap();
            assert!(job.waiter().wait_final(Duration::from_secs(10)));
            job.reap();
        }
        assert!(registry.is_empty());

        // A failed insertion still consumes its identifier
        let failed = registry.insert_with(|_| {
            Err(JobError::Spawn(io::Error::new(io::ErrorKind::Other, "nope")))
        });
        assert_matches!(failed, Err(JobError::Spawn(_)));
        assert_eq!(launch(&registry), JobId::from(4));
    }

    /// Unknown identifiers are reported as such
    #[test]
    fn not_found() {
        let registry = JobRegistry::new();
        assert_matches!(
            registry.with_job(JobId::from(1), |job| job.id()),
            Err(JobError::NotFound(id)) if id == JobId::from(1)
        );
        assert_matches!(
            registry.remove(JobId::from(1)),
            Err(JobError::NotFound(_))
        );
    }

    /// Records can be looked up without being removed
    #[test]
    fn lookup_keeps_record() {
        let registry = JobRegistry::new();
        let id = launch(&registry);
        assert_eq!(registry.with_job(id, |job| job.id()).unwrap(), id);
        assert_eq!(registry.len(), 1);

        let drained = registry.drain();
        assert_eq!(drained.len(), 1);
        assert!(registry.is_empty());
    }
}
