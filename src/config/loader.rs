//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading leave policy
//! from YAML files.

use std::fs;
use std::path::Path;

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::Employee;

use super::types::{EmployeesConfig, GrantStep, ObligationPolicy, PolicyConfig, StorePolicy};

/// Loads and provides access to leave policy configuration.
///
/// # Directory Structure
///
/// ```text
/// config/default/
/// ├── policy.yaml      # Grant step table, obligation rule, store retry
/// └── employees.yaml   # Optional directory seed for the server binary
/// ```
///
/// # Example
///
/// ```no_run
/// use leave_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/default").unwrap();
/// println!("{} grant steps", loader.grant_table().len());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    policy: PolicyConfig,
    employees: Vec<Employee>,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if `policy.yaml` is missing, cannot be parsed, or
    /// fails validation. A missing `employees.yaml` is not an error.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let policy_path = path.join("policy.yaml");
        let policy = Self::load_yaml::<PolicyConfig>(&policy_path)?;
        Self::validate(&policy, &policy_path.display().to_string())?;

        let employees_path = path.join("employees.yaml");
        let employees = if employees_path.exists() {
            Self::load_yaml::<EmployeesConfig>(&employees_path)?.employees
        } else {
            Vec::new()
        };

        Ok(Self { policy, employees })
    }

    /// Parses policy YAML held in memory.
    ///
    /// # Example
    ///
    /// ```
    /// use leave_engine::config::ConfigLoader;
    ///
    /// let loader = ConfigLoader::from_policy_yaml(r#"
    /// grant_table:
    ///   - { service_years: 0.5, days: 10 }
    ///   - { service_years: 1.5, days: 11 }
    /// obligation:
    ///   grant_threshold_days: 10
    ///   target_days: 5
    ///   attention_window_days: 90
    /// "#)?;
    /// assert_eq!(loader.grant_table().len(), 2);
    /// # Ok::<(), leave_engine::error::EngineError>(())
    /// ```
    pub fn from_policy_yaml(yaml: &str) -> EngineResult<Self> {
        let policy: PolicyConfig =
            serde_yaml::from_str(yaml).map_err(|e| EngineError::ConfigParseError {
                path: "<inline>".to_string(),
                message: e.to_string(),
            })?;
        Self::validate(&policy, "<inline>")?;
        Ok(Self {
            policy,
            employees: Vec::new(),
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Checks the step table and obligation rule for values the engine cannot use.
    fn validate(policy: &PolicyConfig, path: &str) -> EngineResult<()> {
        let invalid = |message: String| EngineError::ConfigParseError {
            path: path.to_string(),
            message,
        };

        if policy.grant_table.is_empty() {
            return Err(invalid("grant_table must not be empty".to_string()));
        }

        let mut previous: Option<u32> = None;
        for step in &policy.grant_table {
            let months = step.service_months().ok_or_else(|| {
                invalid(format!(
                    "service_years {} is not a whole number of months",
                    step.service_years
                ))
            })?;
            if previous.is_some_and(|p| months <= p) {
                return Err(invalid(format!(
                    "grant_table must be strictly ascending (service_years {})",
                    step.service_years
                )));
            }
            if step.days <= Decimal::ZERO {
                return Err(invalid(format!(
                    "grant days must be positive (service_years {})",
                    step.service_years
                )));
            }
            previous = Some(months);
        }

        if policy.obligation.attention_window_days < 0 {
            return Err(invalid(
                "attention_window_days must not be negative".to_string(),
            ));
        }
        if policy.store.max_attempts == 0 {
            return Err(invalid("store.max_attempts must be at least 1".to_string()));
        }

        Ok(())
    }

    /// Returns the whole policy.
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Returns the tenure step table.
    pub fn grant_table(&self) -> &[GrantStep] {
        &self.policy.grant_table
    }

    /// Returns the obligation rule parameters.
    pub fn obligation(&self) -> &ObligationPolicy {
        &self.policy.obligation
    }

    /// Returns the store retry parameters.
    pub fn store(&self) -> &StorePolicy {
        &self.policy.store
    }

    /// Returns employees from `employees.yaml`, if present.
    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }
}
