//! Application state
//!
//! Holds the shared state for the Axum application: the publisher and the
//! optional API credential.

use std::sync::Arc;

use crate::core::Publisher;

use super::auth::Credential;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    publisher: Arc<Publisher>,
    credential: Option<Arc<Credential>>,
}

impl AppState {
    pub fn new(publisher: Publisher, credential: Option<Credential>) -> Self {
        Self {
            publisher: Arc::new(publisher),
            credential: credential.map(Arc::new),
        }
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Credential the API requires, if authentication is enabled
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_deref()
    }
}
