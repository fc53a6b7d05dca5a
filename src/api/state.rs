//! Application state for the leave API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::service::LeaveService;

/// Shared application state.
///
/// Holds the leave service every handler delegates to.
#[derive(Clone)]
pub struct AppState {
    service: Arc<LeaveService>,
}

impl AppState {
    /// Creates a new application state around `service`.
    pub fn new(service: LeaveService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Returns a shared handle to the service.
    pub fn service(&self) -> Arc<LeaveService> {
        Arc::clone(&self.service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        // Verify AppState can be cloned (required for axum state)
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
