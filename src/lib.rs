pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notifications;
pub mod reports;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub use cache::RecordCache;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use notifications::{MailTransport, Notifier};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    /// Queue for emails triggered by status changes.
    pub notifier: Notifier,
    /// Used directly by the synchronous mail endpoint.
    pub mailer: Arc<dyn MailTransport>,
    pub cache: Arc<RecordCache>,
}
