//! Configuration types for leave policy.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;

use crate::models::Employee;

/// One row of the tenure step table.
///
/// Grants of `days` fall due once `service_years` of continuous service have
/// elapsed since the join date.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GrantStep {
    /// Years of service at which the grant is due (e.g. 0.5, 1.5).
    pub service_years: Decimal,
    /// Days granted.
    pub days: Decimal,
}

impl GrantStep {
    /// Service length in whole months, if it is a whole number of months.
    pub fn service_months(&self) -> Option<u32> {
        let months = self.service_years * Decimal::from(12);
        if !months.fract().is_zero() || months.is_sign_negative() {
            return None;
        }
        months.to_u32()
    }
}

/// Obligation rule parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObligationPolicy {
    /// Minimum grant size that opens an obligation cycle.
    pub grant_threshold_days: Decimal,
    /// Days that must be consumed within each cycle.
    pub target_days: Decimal,
    /// Cycles ending within this many days are flagged for attention.
    pub attention_window_days: i64,
    /// Whether half-day leave counts toward the target.
    #[serde(default = "default_true")]
    pub count_half_days: bool,
}

fn default_true() -> bool {
    true
}

/// Retry parameters for transient store failures.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorePolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Factor the delay grows by after each retry.
    pub backoff_multiplier: u32,
}

impl StorePolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor =
            u64::from(self.backoff_multiplier.max(1)).saturating_pow(retry.saturating_sub(1));
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 25,
            backoff_multiplier: 2,
        }
    }
}

/// Contents of `policy.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PolicyConfig {
    /// Tenure step table, ordered by service years.
    pub grant_table: Vec<GrantStep>,
    /// Obligation rule parameters.
    pub obligation: ObligationPolicy,
    /// Store retry parameters.
    #[serde(default)]
    pub store: StorePolicy,
}

/// Contents of the optional `employees.yaml` directory seed.
#[derive(Debug, Clone, Deserialize)]
pub struct EmployeesConfig {
    /// Employees to load into the in-memory directory.
    pub employees: Vec<Employee>,
}
