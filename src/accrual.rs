//! Tenure-based grant accrual.
//!
//! The [`AccrualEngine`] turns the configured step table into a per-employee
//! grant schedule and writes due grants into the ledger, opening an
//! obligation cycle for every grant large enough to carry one.

use std::sync::Arc;

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{GrantStep, ObligationPolicy};
use crate::error::{EmployeeFailure, EngineError, EngineResult};
use crate::ledger::{LeaveLedger, LedgerTxn};
use crate::models::{Employee, EntryKind, GrantCycle, NewLedgerEntry};
use crate::store::LeaveStore;

/// Actor recorded on grants written by the accrual batch.
pub const ACCRUAL_ACTOR: &str = "accrual";

/// One scheduled grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledGrant {
    /// Date the grant falls due.
    pub date: NaiveDate,
    /// Days granted.
    pub days: Decimal,
    /// Months of service completed on `date`.
    pub service_months: u32,
}

/// Lazy, unbounded grant schedule for one employee.
///
/// Yields one grant per table row, then repeats the last row's amount every
/// twelve months. Ends only if dates overflow.
#[derive(Debug, Clone)]
pub struct GrantSchedule<'a> {
    join_date: NaiveDate,
    steps: &'a [(u32, Decimal)],
    index: usize,
}

impl Iterator for GrantSchedule<'_> {
    type Item = ScheduledGrant;

    fn next(&mut self) -> Option<Self::Item> {
        let (last_months, last_days) = *self.steps.last()?;
        let (service_months, days) = match self.steps.get(self.index) {
            Some(step) => *step,
            None => {
                let extra_years = u32::try_from(self.index + 1 - self.steps.len()).ok()?;
                (last_months.checked_add(extra_years.checked_mul(12)?)?, last_days)
            }
        };
        let date = self
            .join_date
            .checked_add_months(Months::new(service_months))?;
        self.index += 1;

        Some(ScheduledGrant {
            date,
            days,
            service_months,
        })
    }
}

/// Per-employee outcome of a materialization run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
    /// The employee granted.
    pub employee_id: String,
    /// The grant written.
    pub grant: ScheduledGrant,
    /// Whether the grant opened an obligation cycle.
    pub opened_cycle: bool,
}

/// Aggregate result of [`AccrualEngine::materialize_due_grants`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializationReport {
    /// Grants written in this run.
    pub granted: Vec<GrantRecord>,
    /// Due grants that were already in the ledger.
    pub already_materialized: usize,
    /// Employees that failed.
    pub failures: Vec<EmployeeFailure>,
}

/// What one employee's run wrote, and the error that stopped it, if any.
#[derive(Debug, Default)]
struct EmployeeAccrual {
    granted: Vec<GrantRecord>,
    already_materialized: usize,
    error: Option<EngineError>,
}

/// Derives and materializes tenure-based grants.
pub struct AccrualEngine {
    steps: Vec<(u32, Decimal)>,
    obligation: ObligationPolicy,
    ledger: Arc<LeaveLedger>,
    store: Arc<dyn LeaveStore>,
}

impl AccrualEngine {
    /// Builds an engine from the configured step table.
    ///
    /// Fails with `ConfigParseError` if a row is not a whole number of months.
    pub fn new(
        table: &[GrantStep],
        obligation: ObligationPolicy,
        ledger: Arc<LeaveLedger>,
        store: Arc<dyn LeaveStore>,
    ) -> EngineResult<Self> {
        let steps = table
            .iter()
            .map(|step| {
                step.service_months()
                    .map(|months| (months, step.days))
                    .ok_or_else(|| EngineError::ConfigParseError {
                        path: "grant_table".to_string(),
                        message: format!(
                            "service_years {} is not a whole number of months",
                            step.service_years
                        ),
                    })
            })
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(Self {
            steps,
            obligation,
            ledger,
            store,
        })
    }

    /// The employee's grant schedule, starting from the first step.
    pub fn schedule_for(&self, employee: &Employee) -> EngineResult<GrantSchedule<'_>> {
        Ok(GrantSchedule {
            join_date: employee.require_join_date()?,
            steps: &self.steps,
            index: 0,
        })
    }

    /// The first scheduled grant strictly after `as_of`.
    pub fn next_grant(
        &self,
        employee: &Employee,
        as_of: NaiveDate,
    ) -> EngineResult<Option<ScheduledGrant>> {
        Ok(self.schedule_for(employee)?.find(|g| g.date > as_of))
    }

    /// Days an employee must take in a cycle opened by a grant of `days`.
    pub fn obligation_target_for(&self, days: Decimal) -> Decimal {
        if days >= self.obligation.grant_threshold_days {
            self.obligation.target_days
        } else {
            Decimal::ZERO
        }
    }

    /// Writes every grant due on or before `as_of` for each employee.
    ///
    /// Re-running for the same date writes nothing new. A failing employee is
    /// logged and reported; the others are still processed.
    pub fn materialize_due_grants(
        &self,
        employees: &[Employee],
        as_of: NaiveDate,
    ) -> MaterializationReport {
        let mut report = MaterializationReport::default();

        for employee in employees {
            let outcome = self.materialize_for(employee, as_of);
            let granted_before_failure = outcome.granted.len();
            report.granted.extend(outcome.granted);
            report.already_materialized += outcome.already_materialized;

            if let Some(err) = outcome.error {
                warn!(
                    employee_id = %employee.id,
                    error = %err,
                    granted_before_failure,
                    "Accrual failed for employee, continuing batch"
                );
                report.failures.push(EmployeeFailure::new(&employee.id, &err));
            }
        }

        info!(
            as_of = %as_of,
            employees = employees.len(),
            granted = report.granted.len(),
            already_materialized = report.already_materialized,
            failures = report.failures.len(),
            "Accrual batch completed"
        );

        report
    }

    /// Materializes one employee's due grants.
    ///
    /// Grants committed before a failure are kept in the outcome next to the
    /// error.
    fn materialize_for(&self, employee: &Employee, as_of: NaiveDate) -> EmployeeAccrual {
        let mut outcome = EmployeeAccrual::default();
        let due: Vec<ScheduledGrant> = match self.schedule_for(employee) {
            Ok(schedule) => schedule.take_while(|g| g.date <= as_of).collect(),
            Err(err) => {
                outcome.error = Some(err);
                return outcome;
            }
        };

        let result = self.ledger.with_employee(&employee.id, |txn| {
            for grant in due {
                match self.append_grant(txn, &grant) {
                    Ok(()) => {
                        let cycle = self.ensure_cycle(txn.employee_id(), &grant);
                        let opened_cycle = cycle.as_ref().is_ok_and(|opened| *opened);
                        info!(
                            employee_id = %txn.employee_id(),
                            date = %grant.date,
                            days = %grant.days,
                            opened_cycle,
                            "Grant materialized"
                        );
                        outcome.granted.push(GrantRecord {
                            employee_id: employee.id.clone(),
                            grant,
                            opened_cycle,
                        });
                        // A grant whose cycle failed is repaired by the next run
                        cycle?;
                    }
                    Err(EngineError::GrantAlreadyMaterialized { .. }) => {
                        self.ensure_cycle(txn.employee_id(), &grant)?;
                        outcome.already_materialized += 1;
                    }
                    Err(err) => return Err(err),
                }
            }
            Ok(())
        });

        outcome.error = result.err();
        outcome
    }

    /// Appends one grant entry, refusing a date already granted.
    fn append_grant(&self, txn: &LedgerTxn<'_>, grant: &ScheduledGrant) -> EngineResult<()> {
        if txn.has_entry(EntryKind::Grant, grant.date)? {
            return Err(EngineError::GrantAlreadyMaterialized {
                employee_id: txn.employee_id().to_string(),
                date: grant.date,
            });
        }

        let entry = NewLedgerEntry::grant(txn.employee_id(), grant.days, grant.date)
            .with_reason(format!(
                "Statutory grant after {} months of service",
                grant.service_months
            ))
            .recorded_by(ACCRUAL_ACTOR);
        txn.append(entry)?;
        Ok(())
    }

    /// Opens the grant's cycle unless it exists or the grant is too small.
    ///
    /// Also repairs a cycle missing after an interrupted earlier run.
    fn ensure_cycle(&self, employee_id: &str, grant: &ScheduledGrant) -> EngineResult<bool> {
        let target = self.obligation_target_for(grant.days);
        if target.is_zero() {
            return Ok(false);
        }
        let exists = self
            .store
            .cycles_for(employee_id)?
            .iter()
            .any(|c| c.base_date == grant.date);
        if exists {
            return Ok(false);
        }

        let cycle = GrantCycle::open(employee_id, grant.date, grant.days, target).ok_or_else(
            || EngineError::InvalidEmployee {
                employee_id: employee_id.to_string(),
                field: "join_date".to_string(),
                message: format!("cycle end date for {} is out of range", grant.date),
            },
        )?;
        self.store.insert_cycle(cycle)?;
        Ok(true)
    }
}
