//! In-memory [`LeaveStore`] implementation.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{EngineError, EngineResult};
use crate::models::{GrantCycle, LedgerEntry, Request, RequestId};

use super::LeaveStore;

/// Process-local store backed by hash maps behind read/write locks.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<LedgerEntry>>>,
    cycles: RwLock<HashMap<String, Vec<GrantCycle>>>,
    requests: RwLock<HashMap<RequestId, Request>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn read<'a, T>(lock: &'a RwLock<T>, operation: &str) -> EngineResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| EngineError::StoreUnavailable {
        operation: operation.to_string(),
        message: "lock poisoned".to_string(),
    })
}

fn write<'a, T>(lock: &'a RwLock<T>, operation: &str) -> EngineResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| EngineError::StoreUnavailable {
        operation: operation.to_string(),
        message: "lock poisoned".to_string(),
    })
}

impl LeaveStore for MemoryStore {
    fn insert_entry(&self, entry: LedgerEntry) -> EngineResult<()> {
        write(&self.entries, "insert_entry")?
            .entry(entry.employee_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }

    fn entries_for(&self, employee_id: &str) -> EngineResult<Vec<LedgerEntry>> {
        Ok(read(&self.entries, "entries_for")?
            .get(employee_id)
            .cloned()
            .unwrap_or_default())
    }

    fn insert_cycle(&self, cycle: GrantCycle) -> EngineResult<()> {
        write(&self.cycles, "insert_cycle")?
            .entry(cycle.employee_id.clone())
            .or_default()
            .push(cycle);
        Ok(())
    }

    fn cycles_for(&self, employee_id: &str) -> EngineResult<Vec<GrantCycle>> {
        Ok(read(&self.cycles, "cycles_for")?
            .get(employee_id)
            .cloned()
            .unwrap_or_default())
    }

    fn insert_request(&self, request: Request) -> EngineResult<()> {
        write(&self.requests, "insert_request")?.insert(request.id(), request);
        Ok(())
    }

    fn update_request(&self, request: Request) -> EngineResult<()> {
        let mut requests = write(&self.requests, "update_request")?;
        match requests.get_mut(&request.id()) {
            Some(slot) => {
                *slot = request;
                Ok(())
            }
            None => Err(EngineError::RequestNotFound {
                request_id: request.id().to_string(),
            }),
        }
    }

    fn get_request(&self, id: RequestId) -> EngineResult<Option<Request>> {
        Ok(read(&self.requests, "get_request")?.get(&id).cloned())
    }

    fn requests_for(&self, employee_id: &str) -> EngineResult<Vec<Request>> {
        Ok(read(&self.requests, "requests_for")?
            .values()
            .filter(|r| r.employee_id() == employee_id)
            .cloned()
            .collect())
    }
}
