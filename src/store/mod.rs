//! Persistence boundary for ledger entries, grant cycles and requests.
//!
//! Components never hold data themselves; they read and write through the
//! [`LeaveStore`] trait. [`MemoryStore`] is the in-process implementation and
//! [`RetryingStore`] wraps any store with bounded retries for transient
//! failures.

mod memory;
mod retry;

pub use memory::MemoryStore;
pub use retry::{RetryingStore, with_retry};

use crate::error::EngineResult;
use crate::models::{GrantCycle, LedgerEntry, Request, RequestId};

/// Durable storage used by the engine.
///
/// A successful return means the write is durable. Implementations report
/// transient failures as [`crate::error::EngineError::StoreUnavailable`].
pub trait LeaveStore: Send + Sync {
    /// Persists a ledger entry.
    fn insert_entry(&self, entry: LedgerEntry) -> EngineResult<()>;

    /// Returns an employee's entries in commit order.
    fn entries_for(&self, employee_id: &str) -> EngineResult<Vec<LedgerEntry>>;

    /// Persists a grant cycle.
    fn insert_cycle(&self, cycle: GrantCycle) -> EngineResult<()>;

    /// Returns an employee's cycles in commit order.
    fn cycles_for(&self, employee_id: &str) -> EngineResult<Vec<GrantCycle>>;

    /// Persists a new request.
    fn insert_request(&self, request: Request) -> EngineResult<()>;

    /// Replaces a stored request. Fails with `RequestNotFound` if absent.
    fn update_request(&self, request: Request) -> EngineResult<()>;

    /// Looks up a request by id.
    fn get_request(&self, id: RequestId) -> EngineResult<Option<Request>>;

    /// Returns an employee's requests of both kinds.
    fn requests_for(&self, employee_id: &str) -> EngineResult<Vec<Request>>;
}
