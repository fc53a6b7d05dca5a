//! Statutory obligation tracking.
//!
//! Every grant of at least the configured threshold opens a one-year
//! [`GrantCycle`] in which the employee must take `target_days` of approved
//! paid leave. [`ObligationTracker::classify`] is the single computation
//! every compliance view is rendered from.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ObligationPolicy;
use crate::error::EngineResult;
use crate::models::{GrantCycle, PaidLeaveRequest, Request, RequestStatus};
use crate::store::LeaveStore;

/// Obligation state of one cycle on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationStatus {
    /// The cycle evaluated.
    pub cycle: GrantCycle,
    /// Date the evaluation was made for.
    pub as_of: NaiveDate,
    /// Approved paid-leave days inside the cycle.
    pub obligatory_days_taken: Decimal,
    /// Days still to be taken, never negative.
    pub days_remaining_to_obligation: Decimal,
    /// Whether the target has been reached.
    pub is_obligation_met: bool,
    /// Unmet and the cycle ends within the attention window.
    pub needs_attention: bool,
    /// Unmet and the cycle has ended.
    pub is_violation: bool,
    /// Signed days from `as_of` to the cycle's target end date.
    pub days_until_end: i64,
}

impl ObligationStatus {
    /// Evaluates `cycle` on `as_of` given `taken` eligible days.
    pub fn evaluate(
        cycle: GrantCycle,
        taken: Decimal,
        as_of: NaiveDate,
        attention_window_days: i64,
    ) -> Self {
        let is_obligation_met = taken >= cycle.obligation_target;
        let days_remaining_to_obligation = (cycle.obligation_target - taken).max(Decimal::ZERO);
        let days_until_end = cycle.days_until_end(as_of);

        Self {
            needs_attention: !is_obligation_met
                && (0..attention_window_days).contains(&days_until_end),
            is_violation: !is_obligation_met && days_until_end < 0,
            cycle,
            as_of,
            obligatory_days_taken: taken,
            days_remaining_to_obligation,
            is_obligation_met,
            days_until_end,
        }
    }
}

/// Computes obligation cycles and their consumption.
pub struct ObligationTracker {
    store: Arc<dyn LeaveStore>,
    policy: ObligationPolicy,
}

impl ObligationTracker {
    /// Creates a tracker reading cycles and requests from `store`.
    pub fn new(store: Arc<dyn LeaveStore>, policy: ObligationPolicy) -> Self {
        Self { store, policy }
    }

    /// The obligation policy in force.
    pub fn policy(&self) -> &ObligationPolicy {
        &self.policy
    }

    /// Most recent cycle whose window contains `as_of`.
    pub fn active_cycle(
        &self,
        employee_id: &str,
        as_of: NaiveDate,
    ) -> EngineResult<Option<GrantCycle>> {
        Ok(self
            .store
            .cycles_for(employee_id)?
            .into_iter()
            .filter(|c| c.contains(as_of))
            .max_by_key(|c| c.base_date))
    }

    /// Most recent cycle started on or before `as_of`, open or closed.
    pub fn latest_cycle(
        &self,
        employee_id: &str,
        as_of: NaiveDate,
    ) -> EngineResult<Option<GrantCycle>> {
        Ok(self
            .store
            .cycles_for(employee_id)?
            .into_iter()
            .filter(|c| c.base_date <= as_of)
            .max_by_key(|c| c.base_date))
    }

    /// Approved paid-leave days falling inside `cycle`.
    pub fn obligation_eligible_days(
        &self,
        employee_id: &str,
        cycle: &GrantCycle,
    ) -> EngineResult<Decimal> {
        let requests = self.store.requests_for(employee_id)?;
        Ok(self.eligible_days_in(&requests, cycle))
    }

    /// Classifies the employee's latest cycle on `as_of`.
    ///
    /// Returns `None` when no cycle has started yet; that is "outside the
    /// calculation window", not a violation.
    pub fn classify(
        &self,
        employee_id: &str,
        as_of: NaiveDate,
    ) -> EngineResult<Option<ObligationStatus>> {
        let Some(cycle) = self.latest_cycle(employee_id, as_of)? else {
            return Ok(None);
        };
        let taken = self.obligation_eligible_days(employee_id, &cycle)?;
        Ok(Some(ObligationStatus::evaluate(
            cycle,
            taken,
            as_of,
            self.policy.attention_window_days,
        )))
    }

    /// Every cycle started on or before `as_of`, oldest first.
    ///
    /// Closed cycles are evaluated the day after they ended, so they report
    /// their final state.
    pub fn cycle_history(
        &self,
        employee_id: &str,
        as_of: NaiveDate,
    ) -> EngineResult<Vec<ObligationStatus>> {
        let requests = self.store.requests_for(employee_id)?;
        let mut cycles: Vec<GrantCycle> = self
            .store
            .cycles_for(employee_id)?
            .into_iter()
            .filter(|c| c.base_date <= as_of)
            .collect();
        cycles.sort_by_key(|c| c.base_date);

        Ok(cycles
            .into_iter()
            .map(|cycle| {
                let evaluated_on = cycle
                    .target_end_date
                    .checked_add_days(Days::new(1))
                    .map_or(as_of, |closed| closed.min(as_of));
                let taken = self.eligible_days_in(&requests, &cycle);
                ObligationStatus::evaluate(
                    cycle,
                    taken,
                    evaluated_on,
                    self.policy.attention_window_days,
                )
            })
            .collect())
    }

    fn eligible_days_in(&self, requests: &[Request], cycle: &GrantCycle) -> Decimal {
        requests
            .iter()
            .filter_map(Request::as_paid_leave)
            .filter(|r| self.counts_toward_obligation(r))
            .map(|r| r.days_within(cycle.base_date, cycle.target_end_date))
            .sum()
    }

    fn counts_toward_obligation(&self, request: &PaidLeaveRequest) -> bool {
        request.status == RequestStatus::Approved
            && (self.policy.count_half_days || !request.leave_type.is_half_day())
    }
}
