//! Error types for the leave compliance engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the ledger, accrual, obligation and request lifecycle
//! components can report.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for the leave compliance engine.
///
/// Validation errors (`InvalidDateRange`, `InsufficientBalance`,
/// `AlreadyDecided`) are returned to the caller for correction and are never
/// retried. Only [`EngineError::StoreUnavailable`] is transient.
///
/// # Example
///
/// ```
/// use leave_engine::error::EngineError;
///
/// let error = EngineError::EmployeeNotFound {
///     employee_id: "emp_404".to_string(),
/// };
/// assert_eq!(error.to_string(), "Employee not found: emp_404");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A request's start date is after its end date, or its times are inverted.
    #[error("Invalid date range: {start} to {end} ({message})")]
    InvalidDateRange {
        /// The requested start date.
        start: NaiveDate,
        /// The requested end date.
        end: NaiveDate,
        /// What made the range invalid.
        message: String,
    },

    /// The employee's balance cannot cover the requested amount.
    #[error("Insufficient balance for employee '{employee_id}': requested {requested}, available {available}")]
    InsufficientBalance {
        /// The employee whose balance was checked.
        employee_id: String,
        /// The number of days requested.
        requested: Decimal,
        /// The balance available at the time of the check.
        available: Decimal,
    },

    /// The request has already reached a terminal state.
    #[error("Request '{request_id}' has already been decided ({status})")]
    AlreadyDecided {
        /// The request that was already decided.
        request_id: String,
        /// The terminal status the request is in.
        status: String,
    },

    /// A scheduled grant has already been written to the ledger.
    #[error("Grant for employee '{employee_id}' on {date} is already materialized")]
    GrantAlreadyMaterialized {
        /// The employee the grant belongs to.
        employee_id: String,
        /// The effective date of the grant.
        date: NaiveDate,
    },

    /// The employee is unknown to the directory.
    #[error("Employee not found: {employee_id}")]
    EmployeeNotFound {
        /// The id that was looked up.
        employee_id: String,
    },

    /// The request id is unknown to the store.
    #[error("Request not found: {request_id}")]
    RequestNotFound {
        /// The id that was looked up.
        request_id: String,
    },

    /// A ledger amount is zero or not a multiple of half a day.
    #[error("Invalid amount {amount}: {message}")]
    InvalidAmount {
        /// The rejected amount.
        amount: Decimal,
        /// Why the amount was rejected.
        message: String,
    },

    /// An employee record was missing data the engine needs.
    #[error("Invalid employee '{employee_id}' field '{field}': {message}")]
    InvalidEmployee {
        /// The employee whose record is invalid.
        employee_id: String,
        /// The field that was invalid.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// The backing store could not complete the operation.
    #[error("Store unavailable during {operation}: {message}")]
    StoreUnavailable {
        /// The store operation that failed.
        operation: String,
        /// A description of the failure.
        message: String,
    },
}

impl EngineError {
    /// Returns true if retrying the operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::StoreUnavailable { .. })
    }

    /// Returns a stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                "CONFIG_ERROR"
            }
            EngineError::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            EngineError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            EngineError::AlreadyDecided { .. } => "ALREADY_DECIDED",
            EngineError::GrantAlreadyMaterialized { .. } => "GRANT_ALREADY_MATERIALIZED",
            EngineError::EmployeeNotFound { .. } => "EMPLOYEE_NOT_FOUND",
            EngineError::RequestNotFound { .. } => "REQUEST_NOT_FOUND",
            EngineError::InvalidAmount { .. } => "INVALID_AMOUNT",
            EngineError::InvalidEmployee { .. } => "INVALID_EMPLOYEE",
            EngineError::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

/// One employee's failure inside a batch, reported instead of aborting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeFailure {
    /// The employee that could not be processed.
    pub employee_id: String,
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl EmployeeFailure {
    /// Records `err` against `employee_id`.
    pub fn new(employee_id: impl Into<String>, err: &EngineError) -> Self {
        Self {
            employee_id: employee_id.into(),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
