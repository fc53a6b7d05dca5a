//! Request lifecycle.
//!
//! Requests are created `Pending` and move exactly once to `Approved` or
//! `Rejected`. Approving a paid-leave request debits the ledger; the debit and
//! the status flip happen under the employee's ledger lock, so concurrent
//! approvals for one employee cannot overdraw the balance.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::collaborators::Clock;
use crate::error::{EngineError, EngineResult};
use crate::ledger::{LeaveLedger, LedgerTxn};
use crate::models::{
    AttendanceRequest, AttendanceType, Decision, LeaveType, NewLedgerEntry, PaidLeaveRequest,
    Request, RequestId, RequestStatus,
};
use crate::store::LeaveStore;

/// Actor recorded on compensating entries written by the lifecycle itself.
pub const SYSTEM_ACTOR: &str = "system";

/// Input for a new paid-leave request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaidLeaveSubmission {
    /// The requesting employee.
    pub employee_id: String,
    /// First day of leave.
    pub start_date: NaiveDate,
    /// Last day of leave.
    pub end_date: NaiveDate,
    /// Full or half day.
    pub leave_type: LeaveType,
    /// Reason given.
    #[serde(default)]
    pub reason: String,
}

/// Input for a new attendance exception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSubmission {
    /// The requesting employee.
    pub employee_id: String,
    /// Kind of exception.
    pub attendance_type: AttendanceType,
    /// First affected day.
    pub start_date: NaiveDate,
    /// Last affected day.
    pub end_date: NaiveDate,
    /// Start of the affected period.
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    /// End of the affected period.
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    /// Reason given.
    #[serde(default)]
    pub reason: String,
}

/// Why one item of a bulk approval failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&EngineError> for BulkFailure {
    fn from(err: &EngineError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Outcome of one id in a bulk approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkApproveResult {
    /// The request processed.
    pub request_id: RequestId,
    /// The request's status after processing, if it exists.
    pub status: Option<RequestStatus>,
    /// Set when the approval failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BulkFailure>,
}

impl BulkApproveResult {
    /// Returns true if the request was approved by this call.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// State machine over paid-leave and attendance requests.
pub struct RequestLifecycle {
    store: Arc<dyn LeaveStore>,
    ledger: Arc<LeaveLedger>,
    clock: Arc<dyn Clock>,
}

impl RequestLifecycle {
    /// Creates a lifecycle writing requests to `store` and debits to `ledger`.
    pub fn new(
        store: Arc<dyn LeaveStore>,
        ledger: Arc<LeaveLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            clock,
        }
    }

    /// Submits a paid-leave request.
    ///
    /// The balance check here is advisory; approval re-checks under the
    /// employee's lock.
    pub fn submit_paid_leave(
        &self,
        submission: PaidLeaveSubmission,
    ) -> EngineResult<PaidLeaveRequest> {
        validate_range(submission.start_date, submission.end_date)?;

        let request = PaidLeaveRequest {
            id: RequestId::new(),
            employee_id: submission.employee_id,
            start_date: submission.start_date,
            end_date: submission.end_date,
            leave_type: submission.leave_type,
            reason: submission.reason,
            status: RequestStatus::Pending,
            created_at: self.clock.now(),
            decision: None,
        };

        let requested = request.day_count();
        let available = self
            .ledger
            .balance_as_of(&request.employee_id, self.clock.today())?;
        if requested > available {
            return Err(EngineError::InsufficientBalance {
                employee_id: request.employee_id,
                requested,
                available,
            });
        }

        self.store
            .insert_request(Request::PaidLeave(request.clone()))?;
        info!(
            request_id = %request.id,
            employee_id = %request.employee_id,
            days = %requested,
            "Paid leave request submitted"
        );
        Ok(request)
    }

    /// Submits an attendance exception. Never touches the ledger.
    pub fn submit_attendance(
        &self,
        submission: AttendanceSubmission,
    ) -> EngineResult<AttendanceRequest> {
        validate_range(submission.start_date, submission.end_date)?;
        if let (Some(start), Some(end)) = (submission.start_time, submission.end_time) {
            if submission.start_date == submission.end_date && start >= end {
                return Err(EngineError::InvalidDateRange {
                    start: submission.start_date,
                    end: submission.end_date,
                    message: format!("start time {} must be before end time {}", start, end),
                });
            }
        }

        let request = AttendanceRequest {
            id: RequestId::new(),
            employee_id: submission.employee_id,
            attendance_type: submission.attendance_type,
            start_date: submission.start_date,
            end_date: submission.end_date,
            start_time: submission.start_time,
            end_time: submission.end_time,
            reason: submission.reason,
            status: RequestStatus::Pending,
            created_at: self.clock.now(),
            decision: None,
        };

        self.store
            .insert_request(Request::Attendance(request.clone()))?;
        info!(
            request_id = %request.id,
            employee_id = %request.employee_id,
            attendance_type = ?request.attendance_type,
            "Attendance request submitted"
        );
        Ok(request)
    }

    /// Looks up a request, failing with `RequestNotFound`.
    pub fn get(&self, request_id: RequestId) -> EngineResult<Request> {
        self.store
            .get_request(request_id)?
            .ok_or_else(|| EngineError::RequestNotFound {
                request_id: request_id.to_string(),
            })
    }

    /// Approves a pending request.
    ///
    /// Paid leave is debited on the decision date before the status flips.
    /// If the debit fails the request stays pending; if the status write
    /// fails after the debit, the debit is reversed.
    pub fn approve(&self, request_id: RequestId, approver_id: &str) -> EngineResult<Request> {
        let employee_id = self.get(request_id)?.employee_id().to_string();

        self.ledger.with_employee(&employee_id, |txn| {
            let mut request = self.get(request_id)?;
            ensure_pending(&request)?;

            let decided_at = self.clock.now();
            let decision_date = decided_at.date_naive();
            if let Request::PaidLeave(leave) = &request {
                txn.append(
                    NewLedgerEntry::debit(&employee_id, leave.day_count(), decision_date, leave.id)
                        .with_reason(format!(
                            "Paid leave {} to {}",
                            leave.start_date, leave.end_date
                        ))
                        .recorded_by(approver_id),
                )?;
            }

            request.record_decision(
                RequestStatus::Approved,
                Decision {
                    decided_at,
                    decided_by: approver_id.to_string(),
                    note: None,
                },
            );

            if let Err(err) = self.store.update_request(request.clone()) {
                if let Request::PaidLeave(leave) = &request {
                    self.compensate(txn, leave, decision_date);
                }
                return Err(err);
            }

            info!(
                request_id = %request_id,
                employee_id = %employee_id,
                approver_id,
                "Request approved"
            );
            Ok(request)
        })
    }

    /// Rejects a pending request. No ledger effect.
    pub fn reject(
        &self,
        request_id: RequestId,
        approver_id: &str,
        reason: Option<String>,
    ) -> EngineResult<Request> {
        let employee_id = self.get(request_id)?.employee_id().to_string();

        self.ledger.with_employee(&employee_id, |_txn| {
            let mut request = self.get(request_id)?;
            ensure_pending(&request)?;

            request.record_decision(
                RequestStatus::Rejected,
                Decision {
                    decided_at: self.clock.now(),
                    decided_by: approver_id.to_string(),
                    note: reason,
                },
            );
            self.store.update_request(request.clone())?;

            info!(
                request_id = %request_id,
                employee_id = %employee_id,
                approver_id,
                "Request rejected"
            );
            Ok(request)
        })
    }

    /// Approves each id independently; results are in input order.
    ///
    /// Ids are grouped by employee. Groups are shared out over at most
    /// `available_parallelism` workers; ids of one group run in input order
    /// on one worker. A panic while approving fails only its own group.
    pub fn bulk_approve(
        &self,
        request_ids: &[RequestId],
        approver_id: &str,
    ) -> Vec<BulkApproveResult> {
        let mut results: Vec<Option<BulkApproveResult>> = vec![None; request_ids.len()];
        let mut groups: BTreeMap<String, Vec<(usize, RequestId)>> = BTreeMap::new();

        for (index, &request_id) in request_ids.iter().enumerate() {
            match self.get(request_id) {
                Ok(request) => groups
                    .entry(request.employee_id().to_string())
                    .or_default()
                    .push((index, request_id)),
                Err(err) => results[index] = Some(self.failure(request_id, &err)),
            }
        }

        let groups: Vec<Vec<(usize, RequestId)>> = groups.into_values().collect();
        let workers = thread::available_parallelism()
            .map_or(1, usize::from)
            .min(groups.len());
        let next_group = AtomicUsize::new(0);
        let done: Mutex<Vec<(usize, BulkApproveResult)>> = Mutex::new(Vec::new());

        let work = || {
            while let Some(group) = groups.get(next_group.fetch_add(1, Ordering::Relaxed)) {
                let outcome = self.approve_group(group, approver_id);
                done.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend(outcome);
            }
        };

        thread::scope(|scope| {
            for _ in 1..workers {
                let spawned = thread::Builder::new()
                    .name("bulk-approve".to_string())
                    .spawn_scoped(scope, &work);
                if let Err(err) = spawned {
                    warn!(error = %err, "Could not start bulk approval worker");
                    break;
                }
            }
            // The calling thread works too, so the batch finishes even if no worker started
            work();
        });

        for (index, result) in done.into_inner().unwrap_or_else(PoisonError::into_inner) {
            results[index] = Some(result);
        }

        let results: Vec<BulkApproveResult> = results.into_iter().flatten().collect();
        info!(
            approver_id,
            requested = request_ids.len(),
            approved = results.iter().filter(|r| r.is_success()).count(),
            workers,
            "Bulk approval completed"
        );
        results
    }

    /// Approves one employee's ids in order, containing any panic to the group.
    fn approve_group(
        &self,
        group: &[(usize, RequestId)],
        approver_id: &str,
    ) -> Vec<(usize, BulkApproveResult)> {
        let approved = panic::catch_unwind(AssertUnwindSafe(|| {
            group
                .iter()
                .map(|&(index, id)| (index, self.approve_one(id, approver_id)))
                .collect::<Vec<_>>()
        }));

        approved.unwrap_or_else(|_| {
            error!(requests = group.len(), "Bulk approval group panicked");
            group
                .iter()
                .map(|&(index, id)| {
                    let result = BulkApproveResult {
                        request_id: id,
                        status: self.get(id).ok().map(|r| r.status()),
                        error: Some(BulkFailure {
                            code: "INTERNAL_ERROR".to_string(),
                            message: "approval worker panicked".to_string(),
                        }),
                    };
                    (index, result)
                })
                .collect()
        })
    }

    /// Every request of one employee, newest first.
    pub fn history(&self, employee_id: &str) -> EngineResult<Vec<Request>> {
        let mut requests = self.store.requests_for(employee_id)?;
        requests.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(requests)
    }

    fn approve_one(&self, request_id: RequestId, approver_id: &str) -> BulkApproveResult {
        match self.approve(request_id, approver_id) {
            Ok(request) => BulkApproveResult {
                request_id,
                status: Some(request.status()),
                error: None,
            },
            Err(err) => self.failure(request_id, &err),
        }
    }

    fn failure(&self, request_id: RequestId, err: &EngineError) -> BulkApproveResult {
        warn!(request_id = %request_id, error = %err, "Bulk approval item failed");
        let status = self
            .store
            .get_request(request_id)
            .ok()
            .flatten()
            .map(|r| r.status());
        BulkApproveResult {
            request_id,
            status,
            error: Some(BulkFailure::from(err)),
        }
    }

    /// Reverses a debit whose request could not be marked approved.
    fn compensate(&self, txn: &LedgerTxn<'_>, leave: &PaidLeaveRequest, date: NaiveDate) {
        let reversal =
            NewLedgerEntry::reversal(txn.employee_id(), leave.day_count(), date, leave.id)
                .with_reason("Status write failed after debit")
                .recorded_by(SYSTEM_ACTOR);
        match txn.append(reversal) {
            Ok(entry_id) => debug!(
                request_id = %leave.id,
                entry_id = %entry_id,
                "Debit reversed after failed status write"
            ),
            Err(err) => error!(
                request_id = %leave.id,
                employee_id = %leave.employee_id,
                error = %err,
                "Failed to reverse debit; ledger needs manual correction"
            ),
        }
    }
}

fn validate_range(start: NaiveDate, end: NaiveDate) -> EngineResult<()> {
    if start > end {
        return Err(EngineError::InvalidDateRange {
            start,
            end,
            message: "start date must not be after end date".to_string(),
        });
    }
    Ok(())
}

fn ensure_pending(request: &Request) -> EngineResult<()> {
    if request.status().is_terminal() {
        return Err(EngineError::AlreadyDecided {
            request_id: request.id().to_string(),
            status: request.status().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::FixedClock;
    use crate::ledger::Page;
    use crate::models::{EntryKind, GrantCycle, LedgerEntry};
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        lifecycle: RequestLifecycle,
        ledger: Arc<LeaveLedger>,
        clock: Arc<FixedClock>,
    }

    fn fixture_with(store: Arc<dyn LeaveStore>) -> Fixture {
        let clock = Arc::new(FixedClock::on(date(2024, 1, 5)));
        let ledger = Arc::new(LeaveLedger::new(store.clone(), clock.clone()));
        ledger
            .append(NewLedgerEntry::grant("emp_001", Decimal::from(10), date(2023, 7, 1)))
            .unwrap();
        Fixture {
            lifecycle: RequestLifecycle::new(store, ledger.clone(), clock.clone()),
            ledger,
            clock,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(MemoryStore::new()))
    }

    fn paid(employee_id: &str, start: NaiveDate, end: NaiveDate) -> PaidLeaveSubmission {
        PaidLeaveSubmission {
            employee_id: employee_id.to_string(),
            start_date: start,
            end_date: end,
            leave_type: LeaveType::Full,
            reason: "rest".to_string(),
        }
    }

    /// LC-001: approval debits the ledger on the decision date
    #[test]
    fn test_approve_debits_ledger() {
        let f = fixture();
        let request = f
            .lifecycle
            .submit_paid_leave(paid("emp_001", date(2024, 1, 10), date(2024, 1, 12)))
            .unwrap();

        let approved = f.lifecycle.approve(request.id, "mgr_001").unwrap();

        assert_eq!(approved.status(), RequestStatus::Approved);
        assert_eq!(approved.decision().unwrap().decided_by, "mgr_001");
        assert_eq!(
            f.ledger.balance_as_of("emp_001", date(2024, 1, 5)).unwrap(),
            Decimal::from(7)
        );
        let history = f.ledger.history("emp_001", Page::default()).unwrap();
        assert_eq!(history[0].kind, EntryKind::Debit);
        assert_eq!(history[0].source_request_id, Some(request.id));
        assert_eq!(history[0].effective_date, date(2024, 1, 5));
    }

    /// LC-002: a second approval is refused and writes nothing
    #[test]
    fn test_approve_twice_already_decided() {
        let f = fixture();
        let request = f
            .lifecycle
            .submit_paid_leave(paid("emp_001", date(2024, 1, 10), date(2024, 1, 12)))
            .unwrap();
        f.lifecycle.approve(request.id, "mgr_001").unwrap();
        let entries_before = f.ledger.history("emp_001", Page::default()).unwrap().len();

        match f.lifecycle.approve(request.id, "mgr_001") {
            Err(EngineError::AlreadyDecided { status, .. }) => assert_eq!(status, "approved"),
            other => panic!("Expected AlreadyDecided, got {:?}", other),
        }
        assert_eq!(
            f.ledger.history("emp_001", Page::default()).unwrap().len(),
            entries_before
        );
    }

    #[test]
    fn test_reject_then_approve_refused() {
        let f = fixture();
        let request = f
            .lifecycle
            .submit_paid_leave(paid("emp_001", date(2024, 1, 10), date(2024, 1, 10)))
            .unwrap();

        let rejected = f
            .lifecycle
            .reject(request.id, "mgr_001", Some("short staffed".to_string()))
            .unwrap();
        assert_eq!(rejected.status(), RequestStatus::Rejected);
        assert_eq!(rejected.decision().unwrap().note.as_deref(), Some("short staffed"));

        assert!(matches!(
            f.lifecycle.approve(request.id, "mgr_001"),
            Err(EngineError::AlreadyDecided { .. })
        ));
        assert_eq!(
            f.ledger.balance_as_of("emp_001", date(2024, 1, 5)).unwrap(),
            Decimal::from(10)
        );
    }

    #[test]
    fn test_submit_rejects_inverted_range() {
        let f = fixture();
        let result = f
            .lifecycle
            .submit_paid_leave(paid("emp_001", date(2024, 1, 12), date(2024, 1, 10)));
        assert!(matches!(result, Err(EngineError::InvalidDateRange { .. })));
    }

    #[test]
    fn test_submit_soft_balance_check() {
        let f = fixture();
        let result = f
            .lifecycle
            .submit_paid_leave(paid("emp_001", date(2024, 2, 1), date(2024, 2, 11)));
        match result {
            Err(EngineError::InsufficientBalance {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, Decimal::from(11));
                assert_eq!(available, Decimal::from(10));
            }
            other => panic!("Expected InsufficientBalance, got {:?}", other),
        }
    }

    /// LC-003: attendance requests never touch the ledger
    #[test]
    fn test_attendance_has_no_ledger_effect() {
        let f = fixture();
        let request = f
            .lifecycle
            .submit_attendance(AttendanceSubmission {
                employee_id: "emp_001".to_string(),
                attendance_type: AttendanceType::Late,
                start_date: date(2024, 1, 8),
                end_date: date(2024, 1, 8),
                start_time: NaiveTime::from_hms_opt(9, 0, 0),
                end_time: NaiveTime::from_hms_opt(10, 30, 0),
                reason: "train delay".to_string(),
            })
            .unwrap();

        f.lifecycle.approve(request.id, "mgr_001").unwrap();

        assert_eq!(f.ledger.history("emp_001", Page::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_attendance_times_must_be_ordered() {
        let f = fixture();
        let result = f.lifecycle.submit_attendance(AttendanceSubmission {
            employee_id: "emp_001".to_string(),
            attendance_type: AttendanceType::EarlyDeparture,
            start_date: date(2024, 1, 8),
            end_date: date(2024, 1, 8),
            start_time: NaiveTime::from_hms_opt(15, 0, 0),
            end_time: NaiveTime::from_hms_opt(14, 0, 0),
            reason: String::new(),
        });
        assert!(matches!(result, Err(EngineError::InvalidDateRange { .. })));
    }

    /// LC-004: Scenario D, one insufficient item does not abort the batch
    #[test]
    fn test_bulk_approve_isolates_failures() {
        let f = fixture();
        let req_a = f
            .lifecycle
            .submit_paid_leave(paid("emp_001", date(2024, 2, 1), date(2024, 2, 8)))
            .unwrap();
        let req_b = f
            .lifecycle
            .submit_paid_leave(paid("emp_001", date(2024, 3, 1), date(2024, 3, 5)))
            .unwrap();

        let results = f.lifecycle.bulk_approve(&[req_a.id, req_b.id], "mgr_001");

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].request_id, req_a.id);
        assert!(results[0].is_success());
        assert_eq!(results[0].status, Some(RequestStatus::Approved));

        assert_eq!(results[1].request_id, req_b.id);
        assert_eq!(results[1].status, Some(RequestStatus::Pending));
        assert_eq!(results[1].error.as_ref().unwrap().code, "INSUFFICIENT_BALANCE");

        assert_eq!(
            f.ledger.balance_as_of("emp_001", date(2024, 1, 5)).unwrap(),
            Decimal::from(2)
        );
    }

    #[test]
    fn test_bulk_approve_across_employees_keeps_order() {
        let f = fixture();
        f.ledger
            .append(NewLedgerEntry::grant("emp_002", Decimal::from(10), date(2023, 7, 1)))
            .unwrap();
        let first = f
            .lifecycle
            .submit_paid_leave(paid("emp_002", date(2024, 2, 1), date(2024, 2, 2)))
            .unwrap();
        let second = f
            .lifecycle
            .submit_paid_leave(paid("emp_001", date(2024, 2, 1), date(2024, 2, 2)))
            .unwrap();
        let missing = RequestId::new();

        let results = f
            .lifecycle
            .bulk_approve(&[first.id, missing, second.id], "mgr_001");

        let ids: Vec<RequestId> = results.iter().map(|r| r.request_id).collect();
        assert_eq!(ids, vec![first.id, missing, second.id]);
        assert!(results[0].is_success());
        assert_eq!(results[1].error.as_ref().unwrap().code, "REQUEST_NOT_FOUND");
        assert_eq!(results[1].status, None);
        assert!(results[2].is_success());
    }

    #[test]
    fn test_history_newest_first() {
        let f = fixture();
        let older = f
            .lifecycle
            .submit_paid_leave(paid("emp_001", date(2024, 2, 1), date(2024, 2, 1)))
            .unwrap();
        f.clock.set_date(date(2024, 1, 6));
        let newer = f
            .lifecycle
            .submit_paid_leave(paid("emp_001", date(2024, 2, 2), date(2024, 2, 2)))
            .unwrap();

        let history = f.lifecycle.history("emp_001").unwrap();
        assert_eq!(history[0].id(), newer.id);
        assert_eq!(history[1].id(), older.id);
    }

    /// Store whose request updates can be made to fail, or to panic for one employee.
    struct FlakyUpdates {
        inner: MemoryStore,
        fail_updates: AtomicBool,
        panic_for: Option<&'static str>,
    }

    impl LeaveStore for FlakyUpdates {
        fn insert_entry(&self, entry: LedgerEntry) -> EngineResult<()> {
            self.inner.insert_entry(entry)
        }
        fn entries_for(&self, employee_id: &str) -> EngineResult<Vec<LedgerEntry>> {
            self.inner.entries_for(employee_id)
        }
        fn insert_cycle(&self, cycle: GrantCycle) -> EngineResult<()> {
            self.inner.insert_cycle(cycle)
        }
        fn cycles_for(&self, employee_id: &str) -> EngineResult<Vec<GrantCycle>> {
            self.inner.cycles_for(employee_id)
        }
        fn insert_request(&self, request: Request) -> EngineResult<()> {
            self.inner.insert_request(request)
        }
        fn update_request(&self, request: Request) -> EngineResult<()> {
            if self.panic_for == Some(request.employee_id()) {
                panic!("update_request crashed for {}", request.employee_id());
            }
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(EngineError::StoreUnavailable {
                    operation: "update_request".to_string(),
                    message: "write timeout".to_string(),
                });
            }
            self.inner.update_request(request)
        }
        fn get_request(&self, id: RequestId) -> EngineResult<Option<Request>> {
            self.inner.get_request(id)
        }
        fn requests_for(&self, employee_id: &str) -> EngineResult<Vec<Request>> {
            self.inner.requests_for(employee_id)
        }
    }

    /// LC-005: a failed status write reverses the debit
    #[test]
    fn test_failed_status_write_compensated() {
        let store = Arc::new(FlakyUpdates {
            inner: MemoryStore::new(),
            fail_updates: AtomicBool::new(false),
            panic_for: None,
        });
        let f = fixture_with(store.clone());
        let request = f
            .lifecycle
            .submit_paid_leave(paid("emp_001", date(2024, 1, 10), date(2024, 1, 12)))
            .unwrap();
        store.fail_updates.store(true, Ordering::SeqCst);

        let result = f.lifecycle.approve(request.id, "mgr_001");

        assert!(matches!(result, Err(EngineError::StoreUnavailable { .. })));
        assert_eq!(
            f.lifecycle.get(request.id).unwrap().status(),
            RequestStatus::Pending
        );
        assert_eq!(
            f.ledger.balance_as_of("emp_001", date(2024, 1, 5)).unwrap(),
            Decimal::from(10)
        );
        let kinds: Vec<EntryKind> = f
            .ledger
            .history("emp_001", Page::default())
            .unwrap()
            .iter()
            .map(|e| e.kind)
            .collect();
        assert!(kinds.contains(&EntryKind::Reversal));
    }

    #[test]
    fn test_bulk_approve_many_employees_bounded_workers() {
        let f = fixture();
        let mut ids = Vec::new();
        for n in 0..200 {
            let employee_id = format!("emp_bulk_{:03}", n);
            f.ledger
                .append(NewLedgerEntry::grant(&employee_id, Decimal::from(10), date(2023, 7, 1)))
                .unwrap();
            let request = f
                .lifecycle
                .submit_paid_leave(paid(&employee_id, date(2024, 2, 1), date(2024, 2, 1)))
                .unwrap();
            ids.push(request.id);
        }

        let results = f.lifecycle.bulk_approve(&ids, "mgr_001");

        assert_eq!(results.len(), 200);
        for (result, id) in results.iter().zip(&ids) {
            assert_eq!(result.request_id, *id);
            assert_eq!(result.status, Some(RequestStatus::Approved));
        }
        assert_eq!(
            f.ledger.balance_as_of("emp_bulk_199", date(2024, 1, 5)).unwrap(),
            Decimal::from(9)
        );
    }

    #[test]
    fn test_bulk_approve_panic_fails_only_its_group() {
        let store = Arc::new(FlakyUpdates {
            inner: MemoryStore::new(),
            fail_updates: AtomicBool::new(false),
            panic_for: Some("emp_002"),
        });
        let f = fixture_with(store);
        f.ledger
            .append(NewLedgerEntry::grant("emp_002", Decimal::from(10), date(2023, 7, 1)))
            .unwrap();
        let crashing = f
            .lifecycle
            .submit_paid_leave(paid("emp_002", date(2024, 2, 1), date(2024, 2, 1)))
            .unwrap();
        let healthy = f
            .lifecycle
            .submit_paid_leave(paid("emp_001", date(2024, 2, 1), date(2024, 2, 1)))
            .unwrap();

        let results = f.lifecycle.bulk_approve(&[crashing.id, healthy.id], "mgr_001");

        assert_eq!(results[0].request_id, crashing.id);
        assert_eq!(results[0].status, Some(RequestStatus::Pending));
        assert_eq!(results[0].error.as_ref().unwrap().code, "INTERNAL_ERROR");
        assert_eq!(results[1].request_id, healthy.id);
        assert!(results[1].is_success());
    }
}
