//! HTTP API module for the leave compliance engine.
//!
//! This module provides the REST API endpoints over [`crate::service::LeaveService`].

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    ApproveBody, AsOfBody, AsOfQuery, AttendanceBody, BulkApproveBody, MAX_BULK_APPROVE,
    MAX_PAGE_SIZE, ManualGrantBody, MonitoringQuery, PageQuery, PaidLeaveBody, RejectBody,
};
pub use response::{ApiError, ApiErrorResponse, BulkApproveResponse};
pub use state::AppState;
