//! Grant cycle model.
//!
//! A [`GrantCycle`] is the one-year window opened by a large enough grant,
//! during which a minimum number of days must be consumed.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The obligation window opened by a grant.
///
/// # Example
///
/// ```
/// use leave_engine::models::GrantCycle;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let cycle = GrantCycle::open(
///     "emp_001",
///     NaiveDate::from_ymd_opt(2023, 7, 1).unwrap(),
///     Decimal::new(10, 0),
///     Decimal::new(5, 0),
/// )
/// .unwrap();
///
/// assert_eq!(cycle.target_end_date, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantCycle {
    /// The employee the cycle belongs to.
    pub employee_id: String,
    /// The grant date that opened the cycle.
    pub base_date: NaiveDate,
    /// Days granted on the base date.
    pub grant_amount: Decimal,
    /// Days that must be consumed before the target end date.
    pub obligation_target: Decimal,
    /// Last day of the window (inclusive).
    pub target_end_date: NaiveDate,
}

impl GrantCycle {
    /// Opens a cycle ending the day before the first anniversary of `base_date`.
    ///
    /// Returns `None` if the end date is not representable.
    pub fn open(
        employee_id: impl Into<String>,
        base_date: NaiveDate,
        grant_amount: Decimal,
        obligation_target: Decimal,
    ) -> Option<Self> {
        let target_end_date = base_date
            .checked_add_months(Months::new(12))?
            .pred_opt()?;

        Some(Self {
            employee_id: employee_id.into(),
            base_date,
            grant_amount,
            obligation_target,
            target_end_date,
        })
    }

    /// Returns true if `date` lies inside `[base_date, target_end_date]`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.base_date && date <= self.target_end_date
    }

    /// Signed number of days from `as_of` to the target end date.
    ///
    /// Zero on the end date itself, negative once it has passed.
    pub fn days_until_end(&self, as_of: NaiveDate) -> i64 {
        (self.target_end_date - as_of).num_days()
    }
}
