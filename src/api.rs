//! HTTP API for Telecare
//!
//! JSON endpoints for accounts, appointments, fees, messages and the
//! symptom-intake chatbot.

mod handlers;
mod types;

pub use handlers::create_router;

use crate::config::AppConfig;
use crate::db::Database;
use crate::intake::IntakeContext;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Dialogue configuration applied to every session
    pub fn intake_context(&self) -> IntakeContext {
        IntakeContext::new(self.config.severity_policy)
    }
}
