//! Employee model and related types.
//!
//! This module defines the Employee struct and EmployeeRole enum as supplied
//! by the organisation directory.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// The role an employee holds in the organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeRole {
    /// Regular staff member.
    #[default]
    Staff,
    /// Department or facility manager who may approve requests.
    Manager,
    /// HR administrator with access to manual adjustments.
    Admin,
}

/// Represents an employee whose paid leave is tracked by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: String,
    /// Display name used in monitoring rows.
    pub name: String,
    /// The date the employee joined. Missing in some directory records.
    #[serde(default)]
    pub join_date: Option<NaiveDate>,
    /// The facility the employee belongs to.
    pub facility: String,
    /// The department within the facility.
    #[serde(default)]
    pub department: Option<String>,
    /// The employee's role.
    #[serde(default)]
    pub role: EmployeeRole,
}

impl Employee {
    /// Returns the join date, or `InvalidEmployee` if the directory has none.
    ///
    /// # Examples
    ///
    /// ```
    /// use leave_engine::models::{Employee, EmployeeRole};
    /// use chrono::NaiveDate;
    ///
    /// let employee = Employee {
    ///     id: "emp_001".to_string(),
    ///     name: "Sato Hanako".to_string(),
    ///     join_date: NaiveDate::from_ymd_opt(2023, 1, 1),
    ///     facility: "north_clinic".to_string(),
    ///     department: None,
    ///     role: EmployeeRole::Staff,
    /// };
    /// assert_eq!(
    ///     employee.require_join_date().unwrap(),
    ///     NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    /// );
    /// ```
    pub fn require_join_date(&self) -> EngineResult<NaiveDate> {
        self.join_date.ok_or_else(|| EngineError::InvalidEmployee {
            employee_id: self.id.clone(),
            field: "join_date".to_string(),
            message: "join date is not recorded".to_string(),
        })
    }

    /// Returns true if the employee belongs to the given facility.
    pub fn in_facility(&self, facility: &str) -> bool {
        self.facility == facility
    }
}
