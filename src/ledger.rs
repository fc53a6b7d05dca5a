//! The leave ledger.
//!
//! Append-only record of grants, debits, reversals and manual adjustments.
//! The balance on any date is the sum of entries effective on or before it.
//!
//! Writers for one employee are serialized through a per-employee lock; use
//! [`LeaveLedger::with_employee`] when a balance check and a write must happen
//! atomically together with other state (a request status flip, a cycle).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collaborators::Clock;
use crate::error::{EngineError, EngineResult};
use crate::models::{EntryId, EntryKind, LedgerEntry, NewLedgerEntry, is_half_day_multiple};
use crate::store::LeaveStore;

/// Offset/limit pagination for history views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Number of items to skip.
    pub offset: usize,
    /// Maximum number of items to return.
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// Append-only per-employee leave ledger.
pub struct LeaveLedger {
    store: Arc<dyn LeaveStore>,
    clock: Arc<dyn Clock>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LeaveLedger {
    /// Creates a ledger over `store`.
    pub fn new(store: Arc<dyn LeaveStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Validates and appends one entry, returning its id.
    ///
    /// Withdrawals fail with `InsufficientBalance` if they would take the
    /// balance below zero on or after their effective date.
    pub fn append(&self, entry: NewLedgerEntry) -> EngineResult<EntryId> {
        let employee_id = entry.employee_id.clone();
        self.with_employee(&employee_id, |txn| txn.append(entry))
    }

    /// Sum of the employee's entries effective on or before `date`.
    pub fn balance_as_of(&self, employee_id: &str, date: NaiveDate) -> EngineResult<Decimal> {
        let entries = self.store.entries_for(employee_id)?;
        Ok(sum_as_of(&entries, date))
    }

    /// The employee's entries, newest effective date first.
    pub fn history(&self, employee_id: &str, page: Page) -> EngineResult<Vec<LedgerEntry>> {
        let mut entries = self.store.entries_for(employee_id)?;
        entries.reverse();
        entries.sort_by(|a, b| b.effective_date.cmp(&a.effective_date));
        Ok(entries
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect())
    }

    /// Runs `f` while holding the employee's write lock.
    ///
    /// The [`LedgerTxn`] handle must not escape `f`, and `f` must not call
    /// back into [`LeaveLedger::append`] for the same employee.
    pub fn with_employee<T>(
        &self,
        employee_id: &str,
        f: impl FnOnce(&LedgerTxn<'_>) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let lock = self.lock_for(employee_id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            let txn = LedgerTxn {
                ledger: self,
                employee_id,
            };
            f(&txn)
        };
        drop(lock);
        self.release_lock(employee_id);
        result
    }

    fn lock_for(&self, employee_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(employee_id.to_string())
            .or_default()
            .clone()
    }

    /// Drops the employee's lock once no caller holds or waits on it.
    ///
    /// Handles are only cloned under the map lock, so a count of one there
    /// means the map holds the last reference.
    fn release_lock(&self, employee_id: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(employee_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(employee_id);
        }
    }
}

/// Write handle for one employee, valid while their lock is held.
pub struct LedgerTxn<'a> {
    ledger: &'a LeaveLedger,
    employee_id: &'a str,
}

impl LedgerTxn<'_> {
    /// The employee this transaction is scoped to.
    pub fn employee_id(&self) -> &str {
        self.employee_id
    }

    /// Balance as of `date`, consistent with writes made in this transaction.
    pub fn balance_as_of(&self, date: NaiveDate) -> EngineResult<Decimal> {
        self.ledger.balance_as_of(self.employee_id, date)
    }

    /// The lowest balance reached on or after `date`.
    ///
    /// A withdrawal effective on `date` must not exceed this, otherwise some
    /// later point in the ledger would go negative.
    pub fn available_from(&self, date: NaiveDate) -> EngineResult<Decimal> {
        let mut entries = self.ledger.store.entries_for(self.employee_id)?;
        entries.sort_by_key(|e| e.effective_date);

        let mut available = sum_as_of(&entries, date);
        let mut running = available;
        for entry in entries.iter().filter(|e| e.effective_date > date) {
            running += entry.amount;
            available = available.min(running);
        }
        Ok(available)
    }

    /// True if an entry of `kind` effective on `date` already exists.
    pub fn has_entry(&self, kind: EntryKind, date: NaiveDate) -> EngineResult<bool> {
        Ok(self
            .ledger
            .store
            .entries_for(self.employee_id)?
            .iter()
            .any(|e| e.kind == kind && e.effective_date == date))
    }

    /// Validates and durably appends `entry`.
    pub fn append(&self, entry: NewLedgerEntry) -> EngineResult<EntryId> {
        if entry.employee_id != self.employee_id {
            return Err(EngineError::InvalidEmployee {
                employee_id: entry.employee_id,
                field: "employee_id".to_string(),
                message: format!("entry does not belong to employee {}", self.employee_id),
            });
        }
        validate_amount(&entry)?;

        if entry.is_withdrawal() {
            let requested = -entry.amount;
            let available = self.available_from(entry.effective_date)?;
            if requested > available {
                return Err(EngineError::InsufficientBalance {
                    employee_id: entry.employee_id,
                    requested,
                    available,
                });
            }
        }

        let committed = LedgerEntry::from_new(entry, self.ledger.clock.now());
        let id = committed.id;
        let kind = committed.kind;
        let amount = committed.amount;
        let effective_date = committed.effective_date;
        self.ledger.store.insert_entry(committed)?;

        match kind {
            EntryKind::ManualAdjustment | EntryKind::Reversal => info!(
                employee_id = %self.employee_id,
                entry_id = %id,
                kind = %kind,
                amount = %amount,
                effective_date = %effective_date,
                "Ledger entry appended"
            ),
            EntryKind::Grant | EntryKind::Debit => debug!(
                employee_id = %self.employee_id,
                entry_id = %id,
                kind = %kind,
                amount = %amount,
                effective_date = %effective_date,
                "Ledger entry appended"
            ),
        }

        Ok(id)
    }
}

fn sum_as_of(entries: &[LedgerEntry], date: NaiveDate) -> Decimal {
    entries
        .iter()
        .filter(|e| e.effective_date <= date)
        .map(|e| e.amount)
        .sum()
}

fn validate_amount(entry: &NewLedgerEntry) -> EngineResult<()> {
    let invalid = |message: &str| EngineError::InvalidAmount {
        amount: entry.amount,
        message: message.to_string(),
    };

    if entry.amount.is_zero() {
        return Err(invalid("amount must not be zero"));
    }
    if !is_half_day_multiple(entry.amount) {
        return Err(invalid("amount must be a multiple of 0.5 days"));
    }
    match entry.kind {
        EntryKind::Grant | EntryKind::Reversal if entry.amount < Decimal::ZERO => {
            Err(invalid("grants and reversals must be positive"))
        }
        EntryKind::Debit if entry.amount > Decimal::ZERO => {
            Err(invalid("debits must be negative"))
        }
        EntryKind::Debit if entry.source_request_id.is_none() => {
            Err(invalid("debits must reference a request"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::FixedClock;
    use crate::models::RequestId;
    use crate::store::MemoryStore;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(units: i64, scale: u32) -> Decimal {
        Decimal::new(units, scale)
    }

    fn create_ledger() -> LeaveLedger {
        LeaveLedger::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedClock::on(date(2024, 1, 1))),
        )
    }

    /// LG-001: balance sums entries up to the date
    #[test]
    fn test_balance_as_of_is_point_in_time() {
        let ledger = create_ledger();
        ledger
            .append(NewLedgerEntry::grant("emp_001", dec(10, 0), date(2023, 7, 1)))
            .unwrap();
        ledger
            .append(NewLedgerEntry::debit(
                "emp_001",
                dec(3, 0),
                date(2024, 1, 10),
                RequestId::new(),
            ))
            .unwrap();

        assert_eq!(ledger.balance_as_of("emp_001", date(2023, 6, 30)).unwrap(), Decimal::ZERO);
        assert_eq!(ledger.balance_as_of("emp_001", date(2023, 7, 1)).unwrap(), dec(10, 0));
        assert_eq!(ledger.balance_as_of("emp_001", date(2024, 1, 10)).unwrap(), dec(7, 0));
    }

    /// LG-002: debit exceeding the balance is refused and not recorded
    #[test]
    fn test_overdraw_refused() {
        let ledger = create_ledger();
        ledger
            .append(NewLedgerEntry::grant("emp_001", dec(2, 0), date(2023, 7, 1)))
            .unwrap();

        let result = ledger.append(NewLedgerEntry::debit(
            "emp_001",
            dec(25, 1),
            date(2023, 8, 1),
            RequestId::new(),
        ));

        match result {
            Err(EngineError::InsufficientBalance {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, dec(25, 1));
                assert_eq!(available, dec(2, 0));
            }
            other => panic!("Expected InsufficientBalance, got {:?}", other),
        }
        assert_eq!(ledger.history("emp_001", Page::default()).unwrap().len(), 1);
    }

    /// LG-003: a backdated withdrawal may not break a later debit
    #[test]
    fn test_backdated_withdrawal_checks_later_balance() {
        let ledger = create_ledger();
        ledger
            .append(NewLedgerEntry::grant("emp_001", dec(5, 0), date(2023, 7, 1)))
            .unwrap();
        ledger
            .append(NewLedgerEntry::debit(
                "emp_001",
                dec(4, 0),
                date(2023, 9, 1),
                RequestId::new(),
            ))
            .unwrap();

        let result = ledger.append(NewLedgerEntry::manual("emp_001", dec(-2, 0), date(2023, 8, 1)));
        assert!(matches!(result, Err(EngineError::InsufficientBalance { .. })));
    }

    /// LG-004: amounts must be multiples of half a day
    #[test]
    fn test_granularity_enforced() {
        let ledger = create_ledger();
        let result = ledger.append(NewLedgerEntry::grant("emp_001", dec(25, 2), date(2023, 7, 1)));
        assert!(matches!(result, Err(EngineError::InvalidAmount { .. })));

        let result = ledger.append(NewLedgerEntry::manual("emp_001", Decimal::ZERO, date(2023, 7, 1)));
        assert!(matches!(result, Err(EngineError::InvalidAmount { .. })));
    }

    #[test]
    fn test_debit_requires_request_reference() {
        let ledger = create_ledger();
        ledger
            .append(NewLedgerEntry::grant("emp_001", dec(10, 0), date(2023, 7, 1)))
            .unwrap();
        let mut entry = NewLedgerEntry::debit("emp_001", dec(1, 0), date(2023, 8, 1), RequestId::new());
        entry.source_request_id = None;
        assert!(matches!(ledger.append(entry), Err(EngineError::InvalidAmount { .. })));
    }

    #[test]
    fn test_history_newest_first_with_pagination() {
        let ledger = create_ledger();
        for (days, month) in [(10, 1), (11, 2), (12, 3)] {
            ledger
                .append(NewLedgerEntry::grant("emp_001", dec(days, 0), date(2023, month, 1)))
                .unwrap();
        }

        let all = ledger.history("emp_001", Page::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].effective_date, date(2023, 3, 1));
        assert_eq!(all[2].effective_date, date(2023, 1, 1));

        let second = ledger.history("emp_001", Page { offset: 1, limit: 1 }).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].effective_date, date(2023, 2, 1));
    }

    #[test]
    fn test_txn_rejects_foreign_employee() {
        let ledger = create_ledger();
        let result = ledger.with_employee("emp_001", |txn| {
            txn.append(NewLedgerEntry::grant("emp_002", dec(10, 0), date(2023, 7, 1)))
        });
        assert!(matches!(result, Err(EngineError::InvalidEmployee { .. })));
    }

    #[test]
    fn test_has_entry_matches_kind_and_date() {
        let ledger = create_ledger();
        ledger
            .append(NewLedgerEntry::grant("emp_001", dec(10, 0), date(2023, 7, 1)))
            .unwrap();

        ledger
            .with_employee("emp_001", |txn| {
                assert!(txn.has_entry(EntryKind::Grant, date(2023, 7, 1))?);
                assert!(!txn.has_entry(EntryKind::Grant, date(2024, 7, 1))?);
                assert!(!txn.has_entry(EntryKind::ManualAdjustment, date(2023, 7, 1))?);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_concurrent_debits_never_overdraw() {
        let ledger = Arc::new(create_ledger());
        ledger
            .append(NewLedgerEntry::grant("emp_001", dec(5, 0), date(2023, 7, 1)))
            .unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    ledger
                        .append(NewLedgerEntry::debit(
                            "emp_001",
                            Decimal::ONE,
                            date(2023, 8, 1),
                            RequestId::new(),
                        ))
                        .is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 5);
        assert_eq!(ledger.balance_as_of("emp_001", date(2023, 8, 1)).unwrap(), Decimal::ZERO);
    }

    /// LG-005: employee locks are released once idle
    #[test]
    fn test_idle_employee_locks_pruned() {
        let ledger = Arc::new(create_ledger());
        for n in 0..100 {
            ledger
                .append(NewLedgerEntry::grant(&format!("emp_{:03}", n), dec(10, 0), date(2023, 7, 1)))
                .unwrap();
        }
        assert!(ledger.locks.lock().unwrap().is_empty());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    ledger.append(NewLedgerEntry::debit(
                        "emp_000",
                        dec(5, 1),
                        date(2023, 8, 1),
                        RequestId::new(),
                    ))
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert!(ledger.locks.lock().unwrap().is_empty());
        assert_eq!(ledger.balance_as_of("emp_000", date(2023, 8, 1)).unwrap(), dec(6, 0));
    }

    proptest! {
        /// Property: no sequence of grants and debits drives any point-in-time balance negative.
        #[test]
        fn prop_balance_never_negative(
            ops in prop::collection::vec((any::<bool>(), 1i64..8, 0i64..365), 1..40)
        ) {
            let ledger = create_ledger();
            let base = date(2023, 1, 1);

            for (is_grant, half_days, offset) in ops {
                let amount = Decimal::new(half_days * 5, 1);
                let day = base + chrono::Duration::days(offset);
                let before = ledger.balance_as_of("emp_001", day).unwrap();
                let entry = if is_grant {
                    NewLedgerEntry::grant("emp_001", amount, day)
                } else {
                    NewLedgerEntry::debit("emp_001", amount, day, RequestId::new())
                };
                let applied = ledger.append(entry).is_ok();
                let after = ledger.balance_as_of("emp_001", day).unwrap();

                if applied && is_grant {
                    prop_assert!(after >= before);
                }
                if applied && !is_grant {
                    prop_assert!(after <= before);
                }
            }

            for offset in 0..400 {
                let day = base + chrono::Duration::days(offset);
                prop_assert!(ledger.balance_as_of("emp_001", day).unwrap() >= Decimal::ZERO);
            }
        }
    }
}
