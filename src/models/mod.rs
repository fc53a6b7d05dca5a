//! Core data models for the leave compliance engine.
//!
//! This module contains all the domain models used throughout the engine.

mod employee;
mod grant_cycle;
mod ids;
mod ledger_entry;
mod request;

pub use employee::{Employee, EmployeeRole};
pub use grant_cycle::GrantCycle;
pub use ids::{EntryId, RequestId};
pub use ledger_entry::{EntryKind, LedgerEntry, NewLedgerEntry, is_half_day_multiple};
pub use request::{
    AttendanceRequest, AttendanceType, Decision, LeaveType, PaidLeaveRequest, Request,
    RequestStatus,
};
