use std::sync::Arc;

use crate::calendar::{providers_from_config, CalendarProvider};
use crate::config::AppConfig;
use crate::db::Database;
use crate::notify::Notifier;

/// State shared by every request handler.
pub struct AppState {
    /// Immutable configuration loaded at startup
    pub config: AppConfig,
    /// The SQLite store
    pub db: Database,
    /// Delivers Discord and email notifications after commit
    pub notifier: Notifier,
    /// Calendars that new events are pushed to
    pub calendars: Vec<Arc<dyn CalendarProvider>>,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database, notifier: Notifier) -> Self {
        let calendars = providers_from_config(&config.google);
        Self {
            config,
            db,
            notifier,
            calendars,
        }
    }
}
