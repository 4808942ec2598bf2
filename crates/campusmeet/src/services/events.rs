//! Private (voted) room events and public (open join) events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{
    optional_text, require_member, require_room, require_user, required_text, webhook_urls,
    WithNotices,
};
use crate::db::events::{
    delete_event, get_event, insert_attendee, insert_event, list_attendees, list_public_events,
    list_room_events, list_votes, remove_attendee, upsert_vote,
};
use crate::db::types::{DbAttendee, DbEvent, DbUser};
use crate::db::users::get_user;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::notify::{DiscordPayload, Notification};
use crate::schedule::{tally_by_candidate, CandidateTally, ProposedTime, VoteRecord, VoteValue};

#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: String,
    pub room_id: Option<String>,
    pub created_by: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub public: bool,
    pub proposed_times: Option<Vec<ProposedTime>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbEvent> for EventView {
    type Error = AppError;

    fn try_from(e: DbEvent) -> Result<Self, Self::Error> {
        let proposed_times = if e.public { None } else { Some(e.proposed_times()?) };
        Ok(Self {
            proposed_times,
            id: e.id,
            room_id: e.room_id,
            created_by: e.created_by,
            title: e.title,
            description: e.description,
            category: e.category,
            location: e.location,
            public: e.public,
            start_time: e.start_time,
            end_time: e.end_time,
            created_at: e.created_at,
            updated_at: e.updated_at,
        })
    }
}

/// A room event with the votes of each proposed time.
#[derive(Debug, Serialize)]
pub struct RoomEventView {
    #[serde(flatten)]
    pub event: EventView,
    pub candidates: Vec<CandidateTally>,
}

#[derive(Debug, Serialize)]
pub struct PublicEventView {
    #[serde(flatten)]
    pub event: EventView,
    pub attendee_count: usize,
}

#[derive(Debug, Serialize)]
pub struct AttendeeView {
    pub user_id: String,
    pub name: Option<String>,
    pub school: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl From<DbAttendee> for AttendeeView {
    fn from(a: DbAttendee) -> Self {
        Self {
            user_id: a.user_id,
            name: a.name,
            school: a.school,
            joined_at: a.joined_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PrivateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub proposed_times: Vec<ProposedTime>,
}

#[derive(Debug, Deserialize)]
pub struct PublicEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Raw vote body. The value is checked here so bad values are a validation error.
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub time_index: usize,
    pub vote: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSort {
    /// Earliest start first
    #[default]
    Time,
    /// Newest first
    CreatedAt,
}

#[derive(Debug, Default, Deserialize)]
pub struct PublicEventFilter {
    pub school: Option<String>,
    pub category: Option<String>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sort: EventSort,
}

fn new_event(
    creator: &DbUser,
    title: String,
    description: Option<&str>,
    category: Option<&str>,
    location: Option<&str>,
) -> DbEvent {
    let now = Utc::now();
    DbEvent {
        id: Uuid::new_v4().to_string(),
        room_id: None,
        created_by: creator.id.clone(),
        title,
        description: optional_text(description),
        category: optional_text(category),
        location: optional_text(location),
        public: false,
        proposed_times_json: None,
        start_time: None,
        end_time: None,
        created_at: now,
        updated_at: now,
    }
}

fn room_event_view(event: DbEvent, votes: &[VoteRecord]) -> AppResult<RoomEventView> {
    let proposed = event.proposed_times()?;
    Ok(RoomEventView {
        candidates: tally_by_candidate(&proposed, votes),
        event: EventView::try_from(event)?,
    })
}

/// Creates a voted event in a room and announces it on the room's webhooks.
pub fn create_private_event(
    db: &Database,
    room_id: &str,
    creator: &DbUser,
    req: &PrivateEventRequest,
) -> AppResult<WithNotices<RoomEventView>> {
    let title = required_text(&req.title, "title")?;
    if req.proposed_times.is_empty() {
        return Err(AppError::Validation("proposed_times must not be empty".to_string()));
    }
    if let Some((i, _)) = req.proposed_times.iter().enumerate().find(|(_, t)| t.start >= t.end) {
        return Err(AppError::Validation(format!(
            "proposed time {i} must start before it ends"
        )));
    }

    let mut event = new_event(
        creator,
        title,
        req.description.as_deref(),
        req.category.as_deref(),
        req.location.as_deref(),
    );
    event.room_id = Some(room_id.to_string());
    event.proposed_times_json = Some(serde_json::to_string(&req.proposed_times)?);

    let urls = db.transaction(|tx| {
        require_room(tx, room_id)?;
        require_member(tx, room_id, &creator.id)?;
        insert_event(tx, &event)?;
        webhook_urls(tx, room_id)
    })?;

    info!("Created event {} in room {}", event.id, room_id);
    let payload = DiscordPayload::embed(format!("New event: {}", event.title), event.description.as_deref());
    Ok(WithNotices::new(room_event_view(event, &[])?).notify(Notification::room(urls, payload)))
}

/// Events of a room, newest first, each with per-candidate tallies.
pub fn room_events(db: &Database, room_id: &str, user_id: &str) -> AppResult<Vec<RoomEventView>> {
    let rows = db.transaction(|tx| {
        require_room(tx, room_id)?;
        require_member(tx, room_id, user_id)?;
        list_room_events(tx, room_id, None)?
            .into_iter()
            .map(|e| {
                let votes = list_votes(tx, &e.id)?;
                Ok((e, votes))
            })
            .collect::<AppResult<Vec<_>>>()
    })?;

    rows.into_iter().map(|(e, votes)| room_event_view(e, &votes)).collect()
}

/// Records or overwrites the caller's vote on one proposed time.
pub fn vote(
    db: &Database,
    room_id: &str,
    event_id: &str,
    voter: &DbUser,
    req: &VoteRequest,
) -> AppResult<WithNotices<RoomEventView>> {
    let value: VoteValue = req.vote.parse().map_err(AppError::Validation)?;

    let (event, votes, urls) = db.transaction(|tx| {
        require_room(tx, room_id)?;
        require_member(tx, room_id, &voter.id)?;
        let event = get_event(tx, event_id)?
            .filter(|e| e.room_id.as_deref() == Some(room_id))
            .ok_or_else(|| AppError::not_found("Event"))?;

        let candidates = event.proposed_times()?.len();
        if req.time_index >= candidates {
            return Err(AppError::Validation(format!(
                "time_index must be below {candidates}"
            )));
        }

        upsert_vote(tx, event_id, &voter.id, req.time_index, value)?;
        Ok((event, list_votes(tx, event_id)?, webhook_urls(tx, room_id)?))
    })?;

    let message = format!(
        "{} voted {} on \"{}\" (option {})",
        voter.display_name(),
        value,
        event.title,
        req.time_index + 1
    );
    Ok(WithNotices::new(room_event_view(event, &votes)?)
        .notify(Notification::room(urls, DiscordPayload::text(message))))
}

pub fn create_public_event(db: &Database, creator: &DbUser, req: &PublicEventRequest) -> AppResult<EventView> {
    let title = required_text(&req.title, "title")?;
    if req.start_time >= req.end_time {
        return Err(AppError::Validation("start_time must be before end_time".to_string()));
    }

    let mut event = new_event(
        creator,
        title,
        req.description.as_deref(),
        req.category.as_deref(),
        req.location.as_deref(),
    );
    event.public = true;
    event.start_time = Some(req.start_time);
    event.end_time = Some(req.end_time);

    db.transaction(|tx| insert_event(tx, &event))?;
    info!("Created public event {} by {}", event.id, creator.id);
    EventView::try_from(event)
}

/// Public events matching every given filter.
///
/// `school` matches the creator's school. Date bounds apply to `start_time` and are
/// inclusive.
pub fn public_events(db: &Database, filter: &PublicEventFilter) -> AppResult<Vec<PublicEventView>> {
    let rows = db.transaction(|tx| {
        let mut rows = Vec::new();
        for event in list_public_events(tx, filter.category.as_deref())? {
            if let Some(school) = &filter.school {
                let creator_school = get_user(tx, &event.created_by)?.and_then(|u| u.school);
                if creator_school.as_deref() != Some(school.as_str()) {
                    continue;
                }
            }
            let count = list_attendees(tx, &event.id)?.len();
            rows.push((event, count));
        }
        Ok(rows)
    })?;

    let mut rows: Vec<(DbEvent, usize)> = rows
        .into_iter()
        .filter(|(e, _)| match (filter.from_date, e.start_time) {
            (Some(from), Some(start)) => start >= from,
            (Some(_), None) => false,
            (None, _) => true,
        })
        .filter(|(e, _)| match (filter.to_date, e.start_time) {
            (Some(to), Some(start)) => start <= to,
            (Some(_), None) => false,
            (None, _) => true,
        })
        .collect();

    // rows arrive newest first; the stable sort keeps that order among equal starts
    if filter.sort == EventSort::Time {
        rows.sort_by_key(|(e, _)| e.start_time);
    }

    rows.into_iter()
        .map(|(e, attendee_count)| {
            Ok(PublicEventView {
                event: EventView::try_from(e)?,
                attendee_count,
            })
        })
        .collect()
}

/// A public event by id. Private events are not reachable through this path.
pub fn public_event(db: &Database, event_id: &str) -> AppResult<PublicEventView> {
    let (event, attendee_count) = db.transaction(|tx| {
        let event = get_event(tx, event_id)?
            .filter(|e| e.public)
            .ok_or_else(|| AppError::not_found("Event"))?;
        let count = list_attendees(tx, event_id)?.len();
        Ok((event, count))
    })?;
    Ok(PublicEventView {
        event: EventView::try_from(event)?,
        attendee_count,
    })
}

/// Adds the user to a public event. A second join is a conflict.
pub fn join_event(db: &Database, event_id: &str, user_id: &str) -> AppResult<()> {
    db.transaction(|tx| {
        let event = get_event(tx, event_id)?.ok_or_else(|| AppError::not_found("Event"))?;
        if !event.public {
            return Err(AppError::Validation("Only public events can be joined".to_string()));
        }
        require_user(tx, user_id)?;
        insert_attendee(tx, event_id, user_id)
    })
}

/// Removes the user from the event. Leaving an event never joined is a no-op.
pub fn leave_event(db: &Database, event_id: &str, user_id: &str) -> AppResult<()> {
    db.transaction(|tx| {
        get_event(tx, event_id)?.ok_or_else(|| AppError::not_found("Event"))?;
        remove_attendee(tx, event_id, user_id)?;
        Ok(())
    })
}

pub fn attendees(db: &Database, event_id: &str) -> AppResult<Vec<AttendeeView>> {
    db.transaction(|tx| {
        get_event(tx, event_id)?
            .filter(|e| e.public)
            .ok_or_else(|| AppError::not_found("Event"))?;
        Ok(list_attendees(tx, event_id)?
            .into_iter()
            .map(AttendeeView::from)
            .collect())
    })
}

/// Deletes an event. Only its creator may do so.
pub fn remove_event(db: &Database, event_id: &str, user_id: &str) -> AppResult<EventView> {
    let event = db.transaction(|tx| {
        let event = get_event(tx, event_id)?.ok_or_else(|| AppError::not_found("Event"))?;
        if event.created_by != user_id {
            return Err(AppError::Forbidden(
                "Only the creator can delete this event".to_string(),
            ));
        }
        delete_event(tx, event_id)?;
        Ok(event)
    })?;
    info!("Deleted event {}", event_id);
    EventView::try_from(event)
}
