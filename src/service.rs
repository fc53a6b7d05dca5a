//! The leave service facade.
//!
//! [`LeaveService`] wires the ledger, accrual engine, obligation tracker,
//! request lifecycle and reporter together and exposes the operations the
//! HTTP layer calls. Every operation takes the acting employee ids
//! explicitly; nothing is read from ambient session state.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::accrual::{AccrualEngine, MaterializationReport, ScheduledGrant};
use crate::collaborators::{Clock, EmployeeDirectory, Notifier, ObligationReminder};
use crate::config::ConfigLoader;
use crate::error::{EmployeeFailure, EngineError, EngineResult};
use crate::ledger::{LeaveLedger, Page};
use crate::lifecycle::{
    AttendanceSubmission, BulkApproveResult, PaidLeaveSubmission, RequestLifecycle,
};
use crate::models::{
    AttendanceRequest, EntryId, LedgerEntry, NewLedgerEntry, PaidLeaveRequest, Request, RequestId,
};
use crate::obligation::{ObligationStatus, ObligationTracker};
use crate::reporting::{ComplianceReporter, ComplianceState, FacilitySummary, MonitoringReport};
use crate::store::LeaveStore;

/// An employee's own leave dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveStatus {
    /// The employee.
    pub employee_id: String,
    /// Date the status was computed for.
    pub as_of: NaiveDate,
    /// Balance on `as_of`.
    pub balance: Decimal,
    /// The next scheduled grant, if the join date is known.
    pub next_grant: Option<ScheduledGrant>,
    /// Classification of the latest cycle, `None` outside any window.
    pub obligation: Option<ObligationStatus>,
    /// Summary state of `obligation`.
    pub compliance_state: ComplianceState,
    /// Every cycle so far, oldest first.
    pub cycle_history: Vec<ObligationStatus>,
}

/// Result of a manual grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantReceipt {
    /// The adjustment entry written.
    pub entry_id: EntryId,
    /// The employee adjusted.
    pub employee_id: String,
    /// Signed days adjusted.
    pub days: Decimal,
    /// Date the adjustment takes effect.
    pub effective_date: NaiveDate,
    /// Balance on that date after the adjustment.
    pub balance: Decimal,
}

/// Result of a reminder run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderReport {
    /// Date the targets were selected for.
    pub as_of: NaiveDate,
    /// Reminders delivered.
    pub sent: Vec<ObligationReminder>,
    /// Reminders the notifier refused.
    pub failures: Vec<EmployeeFailure>,
}

/// Entry point for every leave operation.
pub struct LeaveService {
    directory: Arc<dyn EmployeeDirectory>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    ledger: Arc<LeaveLedger>,
    accrual: Arc<AccrualEngine>,
    tracker: Arc<ObligationTracker>,
    lifecycle: RequestLifecycle,
    reporter: ComplianceReporter,
}

impl LeaveService {
    /// Builds the service from loaded policy and its collaborators.
    pub fn new(
        config: &ConfigLoader,
        store: Arc<dyn LeaveStore>,
        directory: Arc<dyn EmployeeDirectory>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> EngineResult<Self> {
        let ledger = Arc::new(LeaveLedger::new(store.clone(), clock.clone()));
        let accrual = Arc::new(AccrualEngine::new(
            config.grant_table(),
            config.obligation().clone(),
            ledger.clone(),
            store.clone(),
        )?);
        let tracker = Arc::new(ObligationTracker::new(
            store.clone(),
            config.obligation().clone(),
        ));
        let lifecycle = RequestLifecycle::new(store, ledger.clone(), clock.clone());
        let reporter = ComplianceReporter::new(
            directory.clone(),
            ledger.clone(),
            accrual.clone(),
            tracker.clone(),
        );

        Ok(Self {
            directory,
            notifier,
            clock,
            ledger,
            accrual,
            tracker,
            lifecycle,
            reporter,
        })
    }

    /// Today according to the service clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Submits a paid-leave request for a known employee.
    pub fn submit_paid_leave_request(
        &self,
        submission: PaidLeaveSubmission,
    ) -> EngineResult<PaidLeaveRequest> {
        self.directory.require(&submission.employee_id)?;
        self.lifecycle.submit_paid_leave(submission)
    }

    /// Submits an attendance exception for a known employee.
    pub fn submit_attendance_request(
        &self,
        submission: AttendanceSubmission,
    ) -> EngineResult<AttendanceRequest> {
        self.directory.require(&submission.employee_id)?;
        self.lifecycle.submit_attendance(submission)
    }

    /// Approves one request on behalf of `approver_id`.
    pub fn approve_request(
        &self,
        request_id: RequestId,
        approver_id: &str,
    ) -> EngineResult<Request> {
        self.directory.require(approver_id)?;
        self.lifecycle.approve(request_id, approver_id)
    }

    /// Rejects one request on behalf of `approver_id`.
    pub fn reject_request(
        &self,
        request_id: RequestId,
        approver_id: &str,
        reason: Option<String>,
    ) -> EngineResult<Request> {
        self.directory.require(approver_id)?;
        self.lifecycle.reject(request_id, approver_id, reason)
    }

    /// Approves several requests, each independently.
    pub fn bulk_approve(
        &self,
        request_ids: &[RequestId],
        approver_id: &str,
    ) -> EngineResult<Vec<BulkApproveResult>> {
        self.directory.require(approver_id)?;
        Ok(self.lifecycle.bulk_approve(request_ids, approver_id))
    }

    /// Records a manual adjustment effective today.
    ///
    /// Negative adjustments are refused if they would overdraw the balance.
    pub fn grant_leave(
        &self,
        employee_id: &str,
        days: Decimal,
        reason: &str,
        granted_by: &str,
    ) -> EngineResult<GrantReceipt> {
        self.directory.require(employee_id)?;
        let effective_date = self.today();

        let entry_id = self.ledger.append(
            NewLedgerEntry::manual(employee_id, days, effective_date)
                .with_reason(reason)
                .recorded_by(granted_by),
        )?;
        let balance = self.ledger.balance_as_of(employee_id, effective_date)?;

        Ok(GrantReceipt {
            entry_id,
            employee_id: employee_id.to_string(),
            days,
            effective_date,
            balance,
        })
    }

    /// Balance, next grant and obligation state for one employee.
    pub fn get_leave_status(
        &self,
        employee_id: &str,
        as_of: Option<NaiveDate>,
    ) -> EngineResult<LeaveStatus> {
        let employee = self.directory.require(employee_id)?;
        let as_of = as_of.unwrap_or_else(|| self.today());

        let next_grant = match self.accrual.next_grant(&employee, as_of) {
            Ok(grant) => grant,
            Err(EngineError::InvalidEmployee { .. }) => None,
            Err(err) => return Err(err),
        };
        let obligation = self.tracker.classify(employee_id, as_of)?;

        Ok(LeaveStatus {
            employee_id: employee.id,
            as_of,
            balance: self.ledger.balance_as_of(employee_id, as_of)?,
            next_grant,
            compliance_state: ComplianceState::from(obligation.as_ref()),
            obligation,
            cycle_history: self.tracker.cycle_history(employee_id, as_of)?,
        })
    }

    /// Monitoring rows for a facility, or everyone.
    pub fn get_compliance_monitoring(
        &self,
        facility: Option<&str>,
        as_of: Option<NaiveDate>,
    ) -> EngineResult<MonitoringReport> {
        self.reporter
            .monitoring(facility, as_of.unwrap_or_else(|| self.today()))
    }

    /// Compliance counts for a facility, or everyone.
    pub fn facility_summary(
        &self,
        facility: Option<&str>,
        as_of: Option<NaiveDate>,
    ) -> EngineResult<FacilitySummary> {
        self.reporter
            .facility_summary(facility, as_of.unwrap_or_else(|| self.today()))
    }

    /// Writes every grant due on or before `as_of` (default today).
    pub fn materialize_due_grants(
        &self,
        as_of: Option<NaiveDate>,
    ) -> EngineResult<MaterializationReport> {
        let employees = self.directory.list(None)?;
        Ok(self
            .accrual
            .materialize_due_grants(&employees, as_of.unwrap_or_else(|| self.today())))
    }

    /// One page of an employee's ledger, newest first.
    pub fn ledger_history(&self, employee_id: &str, page: Page) -> EngineResult<Vec<LedgerEntry>> {
        self.directory.require(employee_id)?;
        self.ledger.history(employee_id, page)
    }

    /// Every request of an employee, newest first.
    pub fn request_history(&self, employee_id: &str) -> EngineResult<Vec<Request>> {
        self.directory.require(employee_id)?;
        self.lifecycle.history(employee_id)
    }

    /// Notifies every employee whose cycle ends soon with the target unmet.
    pub fn send_obligation_reminders(
        &self,
        as_of: Option<NaiveDate>,
    ) -> EngineResult<ReminderReport> {
        let as_of = as_of.unwrap_or_else(|| self.today());
        let mut report = ReminderReport {
            as_of,
            sent: Vec::new(),
            failures: Vec::new(),
        };

        for reminder in self.reporter.reminder_targets(as_of)? {
            match self.notifier.send(&reminder) {
                Ok(()) => report.sent.push(reminder),
                Err(err) => {
                    warn!(
                        employee_id = %reminder.employee_id,
                        error = %err,
                        "Reminder delivery failed"
                    );
                    report
                        .failures
                        .push(EmployeeFailure::new(&reminder.employee_id, &err));
                }
            }
        }

        info!(
            as_of = %as_of,
            sent = report.sent.len(),
            failures = report.failures.len(),
            "Obligation reminders dispatched"
        );
        Ok(report)
    }
}
