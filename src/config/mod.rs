//! Configuration loading and management for the leave compliance engine.
//!
//! This module loads leave policy from YAML files: the tenure grant step
//! table, the obligation rule and store retry settings.
//!
//! # Example
//!
//! ```no_run
//! use leave_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap();
//! println!("Obligation target: {} days", config.obligation().target_days);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{EmployeesConfig, GrantStep, ObligationPolicy, PolicyConfig, StorePolicy};
