//! Ledger entry models.
//!
//! This module contains the [`LedgerEntry`] type recorded by the leave ledger,
//! and the [`NewLedgerEntry`] input used to append one.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EntryId, RequestId};

/// The kind of balance-affecting event an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A scheduled tenure-based grant.
    Grant,
    /// Days consumed by an approved paid-leave request.
    Debit,
    /// Compensation for a debit that could not be completed.
    Reversal,
    /// Privileged override recorded for audit.
    ManualAdjustment,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Grant => write!(f, "grant"),
            EntryKind::Debit => write!(f, "debit"),
            EntryKind::Reversal => write!(f, "reversal"),
            EntryKind::ManualAdjustment => write!(f, "manual_adjustment"),
        }
    }
}

/// Returns true if `amount` is a whole multiple of half a day.
///
/// # Example
///
/// ```
/// use leave_engine::models::is_half_day_multiple;
/// use rust_decimal::Decimal;
///
/// assert!(is_half_day_multiple(Decimal::new(15, 1)));
/// assert!(is_half_day_multiple(Decimal::new(-3, 0)));
/// assert!(!is_half_day_multiple(Decimal::new(25, 2)));
/// ```
pub fn is_half_day_multiple(amount: Decimal) -> bool {
    (amount * Decimal::TWO).fract().is_zero()
}

/// An entry to be appended to an employee's ledger.
///
/// Amounts are signed: grants are positive, debits are negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    /// The employee whose balance changes.
    pub employee_id: String,
    /// Signed number of days.
    pub amount: Decimal,
    /// The kind of event.
    pub kind: EntryKind,
    /// The date from which the entry counts toward the balance.
    pub effective_date: NaiveDate,
    /// The request that caused the entry, if any.
    pub source_request_id: Option<RequestId>,
    /// Free-text reason kept for audit.
    pub reason: Option<String>,
    /// The user or process that recorded the entry.
    pub recorded_by: Option<String>,
}

impl NewLedgerEntry {
    /// A scheduled grant of `days` effective on `date`.
    pub fn grant(employee_id: impl Into<String>, days: Decimal, date: NaiveDate) -> Self {
        Self {
            employee_id: employee_id.into(),
            amount: days,
            kind: EntryKind::Grant,
            effective_date: date,
            source_request_id: None,
            reason: None,
            recorded_by: None,
        }
    }

    /// A debit of `days` for an approved request. The stored amount is negative.
    pub fn debit(
        employee_id: impl Into<String>,
        days: Decimal,
        date: NaiveDate,
        request_id: RequestId,
    ) -> Self {
        Self {
            employee_id: employee_id.into(),
            amount: -days,
            kind: EntryKind::Debit,
            effective_date: date,
            source_request_id: Some(request_id),
            reason: None,
            recorded_by: None,
        }
    }

    /// A reversal restoring `days` previously debited for `request_id`.
    pub fn reversal(
        employee_id: impl Into<String>,
        days: Decimal,
        date: NaiveDate,
        request_id: RequestId,
    ) -> Self {
        Self {
            employee_id: employee_id.into(),
            amount: days,
            kind: EntryKind::Reversal,
            effective_date: date,
            source_request_id: Some(request_id),
            reason: None,
            recorded_by: None,
        }
    }

    /// A manual adjustment of `days` (may be negative).
    pub fn manual(employee_id: impl Into<String>, days: Decimal, date: NaiveDate) -> Self {
        Self {
            employee_id: employee_id.into(),
            amount: days,
            kind: EntryKind::ManualAdjustment,
            effective_date: date,
            source_request_id: None,
            reason: None,
            recorded_by: None,
        }
    }

    /// Sets the audit reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets who recorded the entry.
    pub fn recorded_by(mut self, actor: impl Into<String>) -> Self {
        self.recorded_by = Some(actor.into());
        self
    }

    /// True for entries that take days away from the balance.
    pub fn is_withdrawal(&self) -> bool {
        self.amount.is_sign_negative()
    }
}

/// A committed, immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique id of the entry.
    pub id: EntryId,
    /// The employee whose balance changed.
    pub employee_id: String,
    /// Signed number of days.
    pub amount: Decimal,
    /// The kind of event.
    pub kind: EntryKind,
    /// The date from which the entry counts toward the balance.
    pub effective_date: NaiveDate,
    /// The request that caused the entry, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_request_id: Option<RequestId>,
    /// Free-text reason kept for audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The user or process that recorded the entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_by: Option<String>,
    /// When the entry was committed.
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Commits a new entry with a fresh id.
    pub fn from_new(entry: NewLedgerEntry, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: EntryId::new(),
            employee_id: entry.employee_id,
            amount: entry.amount,
            kind: entry.kind,
            effective_date: entry.effective_date,
            source_request_id: entry.source_request_id,
            reason: entry.reason,
            recorded_by: entry.recorded_by,
            recorded_at,
        }
    }
}
