//! Request types for the leave API.
//!
//! JSON bodies and query strings accepted by the handlers, with conversions
//! into the service's input types.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::Page;
use crate::lifecycle::{AttendanceSubmission, PaidLeaveSubmission};
use crate::models::{AttendanceType, LeaveType, RequestId};

/// Body of `POST /requests/paid-leave`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaidLeaveBody {
    /// The requesting employee.
    pub employee_id: String,
    /// First day of leave.
    pub start_date: NaiveDate,
    /// Last day of leave.
    pub end_date: NaiveDate,
    /// Full or half day.
    #[serde(default = "default_leave_type")]
    pub leave_type: LeaveType,
    /// Reason given.
    #[serde(default)]
    pub reason: String,
}

fn default_leave_type() -> LeaveType {
    LeaveType::Full
}

/// Body of `POST /requests/attendance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceBody {
    /// The requesting employee.
    pub employee_id: String,
    /// Kind of exception.
    pub attendance_type: AttendanceType,
    /// First affected day.
    pub start_date: NaiveDate,
    /// Last affected day.
    pub end_date: NaiveDate,
    /// Start of the affected period.
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    /// End of the affected period.
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    /// Reason given.
    #[serde(default)]
    pub reason: String,
}

/// Body of `POST /requests/:id/approve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveBody {
    /// The approving employee.
    pub approver_id: String,
}

/// Body of `POST /requests/:id/reject`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectBody {
    /// The rejecting employee.
    pub approver_id: String,
    /// Optional explanation.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of `POST /requests/bulk-approve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkApproveBody {
    /// Requests to approve, in order.
    pub request_ids: Vec<RequestId>,
    /// The approving employee.
    pub approver_id: String,
}

/// Most ids a single bulk approval may carry.
pub const MAX_BULK_APPROVE: usize = 500;

/// Body of `POST /employees/:id/grants`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualGrantBody {
    /// Signed days to adjust by.
    pub days: Decimal,
    /// Audit reason.
    pub reason: String,
    /// Who made the adjustment.
    pub granted_by: String,
}

/// Body of the batch endpoints; `as_of` defaults to today.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AsOfBody {
    /// Date to run for.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// `?as_of=` query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AsOfQuery {
    /// Date to report for.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// `?facility=&as_of=` query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringQuery {
    /// Facility to restrict to.
    #[serde(default)]
    pub facility: Option<String>,
    /// Date to report for.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// `?offset=&limit=` query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    /// Items to skip.
    #[serde(default)]
    pub offset: Option<usize>,
    /// Maximum items to return.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Largest page a client may ask for.
pub const MAX_PAGE_SIZE: usize = 500;

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        let default = Page::default();
        Page {
            offset: query.offset.unwrap_or(default.offset),
            limit: query.limit.unwrap_or(default.limit).min(MAX_PAGE_SIZE),
        }
    }
}

impl From<PaidLeaveBody> for PaidLeaveSubmission {
    fn from(body: PaidLeaveBody) -> Self {
        PaidLeaveSubmission {
            employee_id: body.employee_id,
            start_date: body.start_date,
            end_date: body.end_date,
            leave_type: body.leave_type,
            reason: body.reason,
        }
    }
}

impl From<AttendanceBody> for AttendanceSubmission {
    fn from(body: AttendanceBody) -> Self {
        AttendanceSubmission {
            employee_id: body.employee_id,
            attendance_type: body.attendance_type,
            start_date: body.start_date,
            end_date: body.end_date,
            start_time: body.start_time,
            end_time: body.end_time,
            reason: body.reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paid_leave_body_defaults_to_full_day() {
        let json = r#"{
            "employee_id": "emp_001",
            "start_date": "2024-01-10",
            "end_date": "2024-01-12"
        }"#;

        let body: PaidLeaveBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.leave_type, LeaveType::Full);
        assert_eq!(body.reason, "");
    }

    #[test]
    fn test_attendance_body_parses_times() {
        let json = r#"{
            "employee_id": "emp_001",
            "attendance_type": "early_departure",
            "start_date": "2024-01-10",
            "end_date": "2024-01-10",
            "start_time": "15:00:00",
            "end_time": "18:00:00"
        }"#;

        let body: AttendanceBody = serde_json::from_str(json).unwrap();
        let submission: AttendanceSubmission = body.into();
        assert_eq!(submission.attendance_type, AttendanceType::EarlyDeparture);
        assert_eq!(submission.start_time, NaiveTime::from_hms_opt(15, 0, 0));
    }

    #[test]
    fn test_manual_grant_accepts_string_days() {
        let json = r#"{"days": "-1.5", "reason": "correction", "granted_by": "adm_001"}"#;
        let body: ManualGrantBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.days, Decimal::new(-15, 1));
    }

    #[test]
    fn test_page_query_clamps_limit() {
        let page: Page = PageQuery {
            offset: Some(10),
            limit: Some(10_000),
        }
        .into();
        assert_eq!(page.offset, 10);
        assert_eq!(page.limit, MAX_PAGE_SIZE);

        let default: Page = PageQuery::default().into();
        assert_eq!(default, Page::default());
    }
}
