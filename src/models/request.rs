//! Request models for paid leave and attendance exceptions.
//!
//! Both request kinds share one lifecycle, so they are wrapped in the
//! [`Request`] sum type instead of being told apart by id prefixes.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::RequestId;

/// Lifecycle state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Awaiting a decision.
    Pending,
    /// Approved; terminal.
    Approved,
    /// Rejected; terminal.
    Rejected,
}

impl RequestStatus {
    /// Returns true for states no transition may leave.
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::Approved => write!(f, "approved"),
            RequestStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Full or half-day paid leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    /// Whole day.
    Full,
    /// Morning half day.
    HalfAm,
    /// Afternoon half day.
    HalfPm,
}

impl LeaveType {
    /// Days consumed per calendar day of leave.
    pub fn day_fraction(self) -> Decimal {
        match self {
            LeaveType::Full => Decimal::ONE,
            LeaveType::HalfAm | LeaveType::HalfPm => Decimal::new(5, 1),
        }
    }

    /// Returns true for half-day leave.
    pub fn is_half_day(self) -> bool {
        !matches!(self, LeaveType::Full)
    }
}

/// Kind of attendance exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceType {
    /// Absent for whole days.
    Absence,
    /// Arriving late.
    Late,
    /// Leaving early.
    EarlyDeparture,
}

/// Who decided a request and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// When the decision was made.
    pub decided_at: DateTime<Utc>,
    /// The approver's employee id.
    pub decided_by: String,
    /// Optional note, e.g. a rejection reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A paid-leave request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaidLeaveRequest {
    /// Unique id of the request.
    pub id: RequestId,
    /// The requesting employee.
    pub employee_id: String,
    /// First day of leave (inclusive).
    pub start_date: NaiveDate,
    /// Last day of leave (inclusive).
    pub end_date: NaiveDate,
    /// Full or half day.
    pub leave_type: LeaveType,
    /// Reason given by the employee.
    pub reason: String,
    /// Current lifecycle state.
    pub status: RequestStatus,
    /// When the request was submitted.
    pub created_at: DateTime<Utc>,
    /// The decision, once made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
}

impl PaidLeaveRequest {
    /// Total days the request consumes.
    ///
    /// # Example
    ///
    /// ```
    /// use leave_engine::models::{LeaveType, PaidLeaveRequest, RequestId, RequestStatus};
    /// use chrono::{NaiveDate, Utc};
    /// use rust_decimal::Decimal;
    ///
    /// let request = PaidLeaveRequest {
    ///     id: RequestId::new(),
    ///     employee_id: "emp_001".to_string(),
    ///     start_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
    ///     end_date: NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
    ///     leave_type: LeaveType::Full,
    ///     reason: "family trip".to_string(),
    ///     status: RequestStatus::Pending,
    ///     created_at: Utc::now(),
    ///     decision: None,
    /// };
    /// assert_eq!(request.day_count(), Decimal::new(3, 0));
    /// ```
    pub fn day_count(&self) -> Decimal {
        inclusive_days(self.start_date, self.end_date) * self.leave_type.day_fraction()
    }

    /// Days of this request that fall inside `[from, to]`.
    pub fn days_within(&self, from: NaiveDate, to: NaiveDate) -> Decimal {
        let start = self.start_date.max(from);
        let end = self.end_date.min(to);
        inclusive_days(start, end) * self.leave_type.day_fraction()
    }
}

/// An attendance exception request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRequest {
    /// Unique id of the request.
    pub id: RequestId,
    /// The requesting employee.
    pub employee_id: String,
    /// Kind of exception.
    pub attendance_type: AttendanceType,
    /// First affected day (inclusive).
    pub start_date: NaiveDate,
    /// Last affected day (inclusive).
    pub end_date: NaiveDate,
    /// Arrival or departure time, where relevant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    /// End of the affected period, where relevant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    /// Reason given by the employee.
    pub reason: String,
    /// Current lifecycle state.
    pub status: RequestStatus,
    /// When the request was submitted.
    pub created_at: DateTime<Utc>,
    /// The decision, once made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
}

/// Any request governed by the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Request {
    /// A paid-leave request; debits the ledger on approval.
    PaidLeave(PaidLeaveRequest),
    /// An attendance exception; never touches the ledger.
    Attendance(AttendanceRequest),
}

impl Request {
    /// The request id.
    pub fn id(&self) -> RequestId {
        match self {
            Request::PaidLeave(r) => r.id,
            Request::Attendance(r) => r.id,
        }
    }

    /// The requesting employee.
    pub fn employee_id(&self) -> &str {
        match self {
            Request::PaidLeave(r) => &r.employee_id,
            Request::Attendance(r) => &r.employee_id,
        }
    }

    /// Current lifecycle state.
    pub fn status(&self) -> RequestStatus {
        match self {
            Request::PaidLeave(r) => r.status,
            Request::Attendance(r) => r.status,
        }
    }

    /// Submission time.
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Request::PaidLeave(r) => r.created_at,
            Request::Attendance(r) => r.created_at,
        }
    }

    /// The decision, once made.
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            Request::PaidLeave(r) => r.decision.as_ref(),
            Request::Attendance(r) => r.decision.as_ref(),
        }
    }

    /// Returns the paid-leave payload, if this is a paid-leave request.
    pub fn as_paid_leave(&self) -> Option<&PaidLeaveRequest> {
        match self {
            Request::PaidLeave(r) => Some(r),
            Request::Attendance(_) => None,
        }
    }

    /// Moves the request into a terminal state.
    pub(crate) fn record_decision(&mut self, status: RequestStatus, decision: Decision) {
        match self {
            Request::PaidLeave(r) => {
                r.status = status;
                r.decision = Some(decision);
            }
            Request::Attendance(r) => {
                r.status = status;
                r.decision = Some(decision);
            }
        }
    }
}

/// Number of calendar days in `[start, end]`, zero when the range is empty.
fn inclusive_days(start: NaiveDate, end: NaiveDate) -> Decimal {
    let days = (end - start).num_days() + 1;
    Decimal::from(days.max(0))
}
