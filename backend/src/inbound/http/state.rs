//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{AccountCommand, TreeCommand, TreeQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Tree reads and chart data.
    pub trees: Arc<dyn TreeQuery>,
    /// Tree writes and photo uploads.
    pub tree_commands: Arc<dyn TreeCommand>,
    /// Account use-cases.
    pub accounts: Arc<dyn AccountCommand>,
}

impl HttpState {
    /// Construct state from the driving-port implementations.
    ///
    /// # Examples
    /// ```ignore
    /// let service = Arc::new(TreeService::new(records, photos, clock));
    /// let state = HttpState::new(service.clone(), service, Arc::new(accounts));
    /// ```
    pub fn new(
        trees: Arc<dyn TreeQuery>,
        tree_commands: Arc<dyn TreeCommand>,
        accounts: Arc<dyn AccountCommand>,
    ) -> Self {
        Self {
            trees,
            tree_commands,
            accounts,
        }
    }
}
