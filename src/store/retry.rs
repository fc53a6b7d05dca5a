//! Bounded retry with exponential backoff for transient store failures.

use std::thread;

use tracing::warn;

use crate::config::StorePolicy;
use crate::error::EngineResult;
use crate::models::{GrantCycle, LedgerEntry, Request, RequestId};

use super::LeaveStore;

/// Runs `op`, retrying only transient errors until `policy.max_attempts`.
///
/// Validation errors are returned immediately.
pub fn with_retry<T>(
    policy: &StorePolicy,
    operation: &str,
    mut op: impl FnMut() -> EngineResult<T>,
) -> EngineResult<T> {
    let mut attempt = 1;
    loop {
        match op() {
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.backoff_for(attempt);
                warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient store failure, retrying"
                );
                thread::sleep(delay);
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Wraps a store so every call retries transient failures.
#[derive(Debug)]
pub struct RetryingStore<S> {
    inner: S,
    policy: StorePolicy,
}

impl<S: LeaveStore> RetryingStore<S> {
    /// Wraps `inner` with the given retry policy.
    pub fn new(inner: S, policy: StorePolicy) -> Self {
        Self { inner, policy }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: LeaveStore> LeaveStore for RetryingStore<S> {
    fn insert_entry(&self, entry: LedgerEntry) -> EngineResult<()> {
        with_retry(&self.policy, "insert_entry", || {
            self.inner.insert_entry(entry.clone())
        })
    }

    fn entries_for(&self, employee_id: &str) -> EngineResult<Vec<LedgerEntry>> {
        with_retry(&self.policy, "entries_for", || self.inner.entries_for(employee_id))
    }

    fn insert_cycle(&self, cycle: GrantCycle) -> EngineResult<()> {
        with_retry(&self.policy, "insert_cycle", || {
            self.inner.insert_cycle(cycle.clone())
        })
    }

    fn cycles_for(&self, employee_id: &str) -> EngineResult<Vec<GrantCycle>> {
        with_retry(&self.policy, "cycles_for", || self.inner.cycles_for(employee_id))
    }

    fn insert_request(&self, request: Request) -> EngineResult<()> {
        with_retry(&self.policy, "insert_request", || {
            self.inner.insert_request(request.clone())
        })
    }

    fn update_request(&self, request: Request) -> EngineResult<()> {
        with_retry(&self.policy, "update_request", || {
            self.inner.update_request(request.clone())
        })
    }

    fn get_request(&self, id: RequestId) -> EngineResult<Option<Request>> {
        with_retry(&self.policy, "get_request", || self.inner.get_request(id))
    }

    fn requests_for(&self, employee_id: &str) -> EngineResult<Vec<Request>> {
        with_retry(&self.policy, "requests_for", || {
            self.inner.requests_for(employee_id)
        })
    }
}
