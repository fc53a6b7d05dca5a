//! External collaborators the engine depends on.
//!
//! The engine never reads ambient session or organisation state. It asks
//! these capabilities instead: the employee directory for identity and org
//! data, the notifier for reminder dispatch, and the clock for "today".

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::models::Employee;

/// Source of employee records.
pub trait EmployeeDirectory: Send + Sync {
    /// Looks up one employee.
    fn get(&self, employee_id: &str) -> EngineResult<Option<Employee>>;

    /// Lists employees, optionally restricted to one facility.
    fn list(&self, facility: Option<&str>) -> EngineResult<Vec<Employee>>;

    /// Looks up one employee, failing with `EmployeeNotFound` if absent.
    fn require(&self, employee_id: &str) -> EngineResult<Employee> {
        self.get(employee_id)?
            .ok_or_else(|| EngineError::EmployeeNotFound {
                employee_id: employee_id.to_string(),
            })
    }
}

/// Directory held in memory, ordered by employee id.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    employees: RwLock<BTreeMap<String, Employee>>,
}

impl MemoryDirectory {
    /// Creates a directory holding `employees`.
    pub fn new(employees: impl IntoIterator<Item = Employee>) -> Self {
        Self {
            employees: RwLock::new(employees.into_iter().map(|e| (e.id.clone(), e)).collect()),
        }
    }

    /// Adds or replaces an employee.
    pub fn upsert(&self, employee: Employee) {
        self.employees
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(employee.id.clone(), employee);
    }
}

impl EmployeeDirectory for MemoryDirectory {
    fn get(&self, employee_id: &str) -> EngineResult<Option<Employee>> {
        Ok(self
            .employees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(employee_id)
            .cloned())
    }

    fn list(&self, facility: Option<&str>) -> EngineResult<Vec<Employee>> {
        Ok(self
            .employees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|e| facility.is_none_or(|f| e.in_facility(f)))
            .cloned()
            .collect())
    }
}

/// Reminder that an employee's obligation cycle is close to ending unmet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationReminder {
    /// The employee to remind.
    pub employee_id: String,
    /// The employee's facility, for routing to managers.
    pub facility: String,
    /// Days still to be taken.
    pub days_remaining_to_obligation: Decimal,
    /// Last day of the cycle.
    pub target_end_date: NaiveDate,
    /// Calendar days left until the target end date.
    pub days_until_end: i64,
}

/// Delivers reminders.
pub trait Notifier: Send + Sync {
    /// Sends one reminder.
    fn send(&self, reminder: &ObligationReminder) -> EngineResult<()>;
}

/// Notifier that only writes reminders to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, reminder: &ObligationReminder) -> EngineResult<()> {
        info!(
            employee_id = %reminder.employee_id,
            facility = %reminder.facility,
            days_remaining = %reminder.days_remaining_to_obligation,
            target_end_date = %reminder.target_end_date,
            "Obligation reminder"
        );
        Ok(())
    }
}

/// Notifier that keeps every reminder it is given.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<ObligationReminder>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the reminders sent so far.
    pub fn sent(&self) -> Vec<ObligationReminder> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, reminder: &ObligationReminder) -> EngineResult<()> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reminder.clone());
        Ok(())
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Pins the clock to midday on `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self {
            now: Mutex::new(Self::midday(date)),
        }
    }

    /// Moves the clock to midday on `date`.
    pub fn set_date(&self, date: NaiveDate) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = Self::midday(date);
    }

    fn midday(date: NaiveDate) -> DateTime<Utc> {
        date.and_hms_opt(12, 0, 0)
            .unwrap_or_default()
            .and_utc()
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(id: &str, facility: &str) -> Employee {
        Employee {
            id: id.to_string(),
            name: id.to_string(),
            join_date: NaiveDate::from_ymd_opt(2023, 1, 1),
            facility: facility.to_string(),
            department: None,
            role: Default::default(),
        }
    }

    #[test]
    fn test_directory_filters_by_facility() {
        let directory = MemoryDirectory::new(vec![
            employee("emp_001", "north"),
            employee("emp_002", "south"),
            employee("emp_003", "north"),
        ]);

        let north = directory.list(Some("north")).unwrap();
        assert_eq!(north.len(), 2);
        assert_eq!(directory.list(None).unwrap().len(), 3);
    }

    #[test]
    fn test_require_unknown_employee() {
        let directory = MemoryDirectory::default();
        match directory.require("ghost") {
            Err(EngineError::EmployeeNotFound { employee_id }) => assert_eq!(employee_id, "ghost"),
            other => panic!("Expected EmployeeNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_fixed_clock_can_move() {
        let clock = FixedClock::on(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());

        clock.set_date(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
    }

    #[test]
    fn test_recording_notifier_keeps_reminders() {
        let notifier = RecordingNotifier::new();
        let reminder = ObligationReminder {
            employee_id: "emp_001".to_string(),
            facility: "north".to_string(),
            days_remaining_to_obligation: Decimal::new(2, 0),
            target_end_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            days_until_end: 1,
        };
        notifier.send(&reminder).unwrap();
        assert_eq!(notifier.sent(), vec![reminder]);
    }
}
