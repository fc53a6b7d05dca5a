//! Paid-leave entitlement and statutory obligation compliance engine.
//!
//! This crate keeps an append-only leave ledger per employee, materializes
//! tenure-based grants, tracks the five-day obligatory consumption rule per
//! grant cycle, and governs the request lifecycle that debits balances.

#![warn(missing_docs)]

pub mod accrual;
pub mod api;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod models;
pub mod obligation;
pub mod reporting;
pub mod service;
pub mod store;
