use std::sync::Arc;

use shared::LiveConfig;
use sqlx::SqlitePool;

pub mod auth;
pub mod cache;
pub mod database;
pub mod handlers;
pub mod service;

use cache::Cache;
use service::sms::SmsGateway;

/// Shared application state, cloned into every connection task.
///
/// Everything in here is either an `Arc` or internally reference-counted
/// (`SqlitePool`, `LiveConfig`), so a clone is a handful of pointer bumps.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub cache: Arc<dyn Cache>,
    pub config: LiveConfig,
    /// Token signing secret, resolved once at startup.  Config hot-reloads
    /// deliberately do NOT touch this — swapping the secret at runtime would
    /// invalidate every outstanding login.
    pub secret: Arc<str>,
    pub sms: Arc<dyn SmsGateway>,
}
