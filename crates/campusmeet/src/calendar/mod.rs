//! External calendar providers.
//!
//! Neither Google nor Apple sync is built yet; both providers answer
//! [`CalendarError::NotImplemented`] and callers treat sync as best-effort.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GoogleConfig;
use crate::db::types::DbUser;
use crate::services::events::EventView;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("{0} calendar integration is not implemented yet")]
    NotImplemented(&'static str),
}

/// A busy interval reported by an external calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusySlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Create,
    Update { external_id: String },
    Delete { external_id: String },
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Creates the event and returns the provider's id for it.
    async fn create_event(&self, user: &DbUser, event: &EventView) -> Result<String, CalendarError>;

    async fn update_event(&self, user: &DbUser, event: &EventView, external_id: &str) -> Result<(), CalendarError>;

    async fn delete_event(&self, user: &DbUser, external_id: &str) -> Result<(), CalendarError>;

    async fn busy_slots(
        &self,
        user: &DbUser,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BusySlot>, CalendarError>;
}

/// Google Calendar through OAuth. Holds the client settings for when sync lands.
pub struct GoogleProvider {
    config: GoogleConfig,
}

impl GoogleProvider {
    pub fn new(config: GoogleConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.client_id.is_some()
    }
}

#[async_trait]
impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "Google"
    }

    async fn create_event(&self, _user: &DbUser, _event: &EventView) -> Result<String, CalendarError> {
        Err(CalendarError::NotImplemented(self.name()))
    }

    async fn update_event(&self, _user: &DbUser, _event: &EventView, _external_id: &str) -> Result<(), CalendarError> {
        Err(CalendarError::NotImplemented(self.name()))
    }

    async fn delete_event(&self, _user: &DbUser, _external_id: &str) -> Result<(), CalendarError> {
        Err(CalendarError::NotImplemented(self.name()))
    }

    async fn busy_slots(
        &self,
        _user: &DbUser,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<BusySlot>, CalendarError> {
        Err(CalendarError::NotImplemented(self.name()))
    }
}

/// Apple iCloud calendar over CalDAV.
pub struct AppleProvider;

#[async_trait]
impl CalendarProvider for AppleProvider {
    fn name(&self) -> &'static str {
        "Apple"
    }

    async fn create_event(&self, _user: &DbUser, _event: &EventView) -> Result<String, CalendarError> {
        Err(CalendarError::NotImplemented(self.name()))
    }

    async fn update_event(&self, _user: &DbUser, _event: &EventView, _external_id: &str) -> Result<(), CalendarError> {
        Err(CalendarError::NotImplemented(self.name()))
    }

    async fn delete_event(&self, _user: &DbUser, _external_id: &str) -> Result<(), CalendarError> {
        Err(CalendarError::NotImplemented(self.name()))
    }

    async fn busy_slots(
        &self,
        _user: &DbUser,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<BusySlot>, CalendarError> {
        Err(CalendarError::NotImplemented(self.name()))
    }
}

/// Providers to sync with under the given Google settings.
///
/// Google is only listed when a client id is configured. Apple is never listed since no
/// credentials are stored for it.
pub fn providers_from_config(google: &GoogleConfig) -> Vec<Arc<dyn CalendarProvider>> {
    let google = GoogleProvider::new(google.clone());
    if !google.is_configured() {
        return Vec::new();
    }
    let provider: Arc<dyn CalendarProvider> = Arc::new(google);
    vec![provider]
}

/// Pushes one event change to every provider. Errors are logged and dropped.
///
/// # Returns
/// How many providers accepted the change.
pub async fn sync_event_to_calendars(
    providers: &[Arc<dyn CalendarProvider>],
    user: &DbUser,
    event: &EventView,
    action: &SyncAction,
) -> usize {
    let mut synced = 0;
    for provider in providers {
        let result = match action {
            SyncAction::Create => provider.create_event(user, event).await.map(|id| {
                debug!("{} created external event {}", provider.name(), id);
            }),
            SyncAction::Update { external_id } => provider.update_event(user, event, external_id).await,
            SyncAction::Delete { external_id } => provider.delete_event(user, external_id).await,
        };

        match result {
            Ok(()) => synced += 1,
            Err(e) => warn!("Failed to sync event {} to {}: {}", event.id, provider.name(), e),
        }
    }
    synced
}
