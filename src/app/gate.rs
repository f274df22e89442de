use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Admits one book job at a time. Attempts while a job runs are refused, not
/// queued.
#[derive(Debug, Clone)]
pub struct JobGate {
    semaphore: Arc<Semaphore>,
}

/// Held for the lifetime of a job; dropping it reopens the gate.
#[derive(Debug)]
pub struct JobPermit {
    _permit: OwnedSemaphorePermit,
}

impl Default for JobGate {
    fn default() -> Self {
        Self::new()
    }
}

impl JobGate {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn try_start(&self) -> Option<JobPermit> {
        let permit = Arc::clone(&self.semaphore).try_acquire_owned().ok()?;
        Some(JobPermit { _permit: permit })
    }

    pub fn is_busy(&self) -> bool {
        self.semaphore.available_permits() == 0
    }
}
