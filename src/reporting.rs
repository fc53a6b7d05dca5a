//! Read-only compliance reporting.
//!
//! Joins the ledger, accrual schedule and obligation tracker into one row per
//! employee, and aggregates rows into facility summaries. Nothing here takes
//! a ledger lock; rows reflect the store at the moment they are read.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::accrual::AccrualEngine;
use crate::collaborators::{EmployeeDirectory, ObligationReminder};
use crate::error::{EmployeeFailure, EngineError, EngineResult};
use crate::ledger::LeaveLedger;
use crate::models::Employee;
use crate::obligation::{ObligationStatus, ObligationTracker};

/// Overall compliance position of one employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceState {
    /// No obligation cycle has started.
    OutsideWindow,
    /// Unmet, with time to spare.
    OnTrack,
    /// Target reached.
    Met,
    /// Unmet and ending within the attention window.
    Warning,
    /// Unmet after the cycle ended.
    Violation,
}

impl From<Option<&ObligationStatus>> for ComplianceState {
    fn from(status: Option<&ObligationStatus>) -> Self {
        match status {
            None => ComplianceState::OutsideWindow,
            Some(s) if s.is_obligation_met => ComplianceState::Met,
            Some(s) if s.is_violation => ComplianceState::Violation,
            Some(s) if s.needs_attention => ComplianceState::Warning,
            Some(_) => ComplianceState::OnTrack,
        }
    }
}

/// One employee's line on the monitoring dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringRow {
    /// Employee id.
    pub employee_id: String,
    /// Display name.
    pub name: String,
    /// Facility the employee belongs to.
    pub facility: String,
    /// Department, if any.
    pub department: Option<String>,
    /// Join date, if known.
    pub join_date: Option<NaiveDate>,
    /// Balance on the report date.
    pub balance: Decimal,
    /// Date of the next scheduled grant.
    pub next_grant_date: Option<NaiveDate>,
    /// Size of the next scheduled grant.
    pub next_grant_days: Option<Decimal>,
    /// First day of the evaluated cycle.
    pub cycle_start: Option<NaiveDate>,
    /// Last day of the evaluated cycle.
    pub target_end_date: Option<NaiveDate>,
    /// Days to be taken in the evaluated cycle.
    pub obligation_target: Option<Decimal>,
    /// Approved days taken inside the cycle; `None` outside any window.
    pub obligatory_days_taken: Option<Decimal>,
    /// Days still to be taken; `None` outside any window.
    pub days_remaining_to_obligation: Option<Decimal>,
    /// Target reached; `None` outside any window.
    pub is_obligation_met: Option<bool>,
    /// Unmet and ending soon; `None` outside any window.
    pub needs_attention: Option<bool>,
    /// Unmet after the cycle ended; `None` outside any window.
    pub is_violation: Option<bool>,
    /// Signed days until the cycle ends.
    pub days_until_end: Option<i64>,
    /// Summary state derived from the flags above.
    pub compliance_state: ComplianceState,
    /// Earlier, superseded cycles that ended unmet.
    pub past_violations: usize,
}

/// Rows for a set of employees plus the employees that could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringReport {
    /// One row per readable employee, ordered by employee id.
    pub rows: Vec<MonitoringRow>,
    /// Employees whose row failed.
    pub failures: Vec<EmployeeFailure>,
}

/// Facility-wide compliance counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilitySummary {
    /// Facility summarized, or `None` for the whole organisation.
    pub facility: Option<String>,
    /// Report date.
    pub as_of: NaiveDate,
    /// Employees considered, including failures.
    pub total: usize,
    /// Employees in violation.
    pub violation: usize,
    /// Employees needing attention.
    pub warning: usize,
    /// Employees inside a cycle whose target is not yet met.
    pub unmet: usize,
    /// Employees whose target is met.
    pub met: usize,
    /// Employees with no cycle yet.
    pub outside_window: usize,
    /// Employees whose row could not be computed.
    pub errors: usize,
}

impl FacilitySummary {
    fn tally(facility: Option<String>, as_of: NaiveDate, report: &MonitoringReport) -> Self {
        let count = |state: ComplianceState| {
            report
                .rows
                .iter()
                .filter(|r| r.compliance_state == state)
                .count()
        };

        Self {
            facility,
            as_of,
            total: report.rows.len() + report.failures.len(),
            violation: count(ComplianceState::Violation),
            warning: count(ComplianceState::Warning),
            unmet: report
                .rows
                .iter()
                .filter(|r| r.is_obligation_met == Some(false))
                .count(),
            met: count(ComplianceState::Met),
            outside_window: count(ComplianceState::OutsideWindow),
            errors: report.failures.len(),
        }
    }
}

/// Builds monitoring rows and summaries.
pub struct ComplianceReporter {
    directory: Arc<dyn EmployeeDirectory>,
    ledger: Arc<LeaveLedger>,
    accrual: Arc<AccrualEngine>,
    tracker: Arc<ObligationTracker>,
}

impl ComplianceReporter {
    /// Creates a reporter over the given components.
    pub fn new(
        directory: Arc<dyn EmployeeDirectory>,
        ledger: Arc<LeaveLedger>,
        accrual: Arc<AccrualEngine>,
        tracker: Arc<ObligationTracker>,
    ) -> Self {
        Self {
            directory,
            ledger,
            accrual,
            tracker,
        }
    }

    /// One employee's monitoring row.
    pub fn monitoring_row(
        &self,
        employee_id: &str,
        as_of: NaiveDate,
    ) -> EngineResult<MonitoringRow> {
        let employee = self.directory.require(employee_id)?;
        self.row_for(&employee, as_of)
    }

    /// Rows for every employee, optionally limited to one facility.
    pub fn monitoring(
        &self,
        facility: Option<&str>,
        as_of: NaiveDate,
    ) -> EngineResult<MonitoringReport> {
        let mut report = MonitoringReport::default();
        for employee in self.directory.list(facility)? {
            match self.row_for(&employee, as_of) {
                Ok(row) => report.rows.push(row),
                Err(err) => {
                    warn!(
                        employee_id = %employee.id,
                        error = %err,
                        "Monitoring row failed"
                    );
                    report.failures.push(EmployeeFailure::new(&employee.id, &err));
                }
            }
        }
        report.rows.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));
        Ok(report)
    }

    /// Compliance counts for a facility, or the whole organisation.
    pub fn facility_summary(
        &self,
        facility: Option<&str>,
        as_of: NaiveDate,
    ) -> EngineResult<FacilitySummary> {
        let report = self.monitoring(facility, as_of)?;
        let summary = FacilitySummary::tally(facility.map(str::to_string), as_of, &report);
        debug!(
            facility = facility.unwrap_or("*"),
            total = summary.total,
            violation = summary.violation,
            warning = summary.warning,
            "Facility summary computed"
        );
        Ok(summary)
    }

    /// Reminders for every employee needing attention on `as_of`.
    pub fn reminder_targets(&self, as_of: NaiveDate) -> EngineResult<Vec<ObligationReminder>> {
        Ok(self
            .monitoring(None, as_of)?
            .rows
            .into_iter()
            .filter(|r| r.needs_attention == Some(true))
            .filter_map(|r| {
                Some(ObligationReminder {
                    target_end_date: r.target_end_date?,
                    days_until_end: r.days_until_end?,
                    employee_id: r.employee_id,
                    facility: r.facility,
                    days_remaining_to_obligation: r.days_remaining_to_obligation?,
                })
            })
            .collect())
    }

    fn row_for(&self, employee: &Employee, as_of: NaiveDate) -> EngineResult<MonitoringRow> {
        let balance = self.ledger.balance_as_of(&employee.id, as_of)?;
        let next_grant = match self.accrual.next_grant(employee, as_of) {
            Ok(grant) => grant,
            Err(EngineError::InvalidEmployee { .. }) => None,
            Err(err) => return Err(err),
        };
        let status = self.tracker.classify(&employee.id, as_of)?;
        let past_violations = self
            .tracker
            .cycle_history(&employee.id, as_of)?
            .iter()
            .filter(|h| h.is_violation)
            .filter(|h| {
                status
                    .as_ref()
                    .is_none_or(|current| h.cycle.base_date != current.cycle.base_date)
            })
            .count();

        Ok(MonitoringRow {
            employee_id: employee.id.clone(),
            name: employee.name.clone(),
            facility: employee.facility.clone(),
            department: employee.department.clone(),
            join_date: employee.join_date,
            balance,
            next_grant_date: next_grant.as_ref().map(|g| g.date),
            next_grant_days: next_grant.as_ref().map(|g| g.days),
            cycle_start: status.as_ref().map(|s| s.cycle.base_date),
            target_end_date: status.as_ref().map(|s| s.cycle.target_end_date),
            obligation_target: status.as_ref().map(|s| s.cycle.obligation_target),
            obligatory_days_taken: status.as_ref().map(|s| s.obligatory_days_taken),
            days_remaining_to_obligation: status.as_ref().map(|s| s.days_remaining_to_obligation),
            is_obligation_met: status.as_ref().map(|s| s.is_obligation_met),
            needs_attention: status.as_ref().map(|s| s.needs_attention),
            is_violation: status.as_ref().map(|s| s.is_violation),
            days_until_end: status.as_ref().map(|s| s.days_until_end),
            compliance_state: ComplianceState::from(status.as_ref()),
            past_violations,
        })
    }
}
