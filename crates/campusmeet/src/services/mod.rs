//! Service operations. Each public function runs in exactly one database transaction and
//! returns the notifications to dispatch once that transaction has committed.

pub mod auth;
pub mod events;
pub mod rooms;
pub mod timetable;
pub mod users;

use chrono::Duration;
use rusqlite::Connection;

use crate::db::rooms::{get_member_role, get_room, list_webhooks};
use crate::db::types::{DbRoom, DbUser, RoomRole};
use crate::db::users::get_user;
use crate::error::{AppError, AppResult};
use crate::notify::Notification;

const CODE_TTL_MINUTES: i64 = 10;

/// Lifetime of verification codes and login OTPs.
pub fn code_ttl() -> Duration {
    Duration::minutes(CODE_TTL_MINUTES)
}

/// A service result plus the messages that go out after commit.
#[derive(Debug)]
pub struct WithNotices<T> {
    pub value: T,
    pub notices: Vec<Notification>,
}

impl<T> WithNotices<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            notices: Vec::new(),
        }
    }

    pub fn notify(mut self, notice: Option<Notification>) -> Self {
        self.notices.extend(notice);
        self
    }
}

pub(crate) fn require_user(conn: &Connection, user_id: &str) -> AppResult<DbUser> {
    get_user(conn, user_id)?.ok_or_else(|| AppError::not_found("User"))
}

pub(crate) fn require_room(conn: &Connection, room_id: &str) -> AppResult<DbRoom> {
    get_room(conn, room_id)?.ok_or_else(|| AppError::not_found("Room"))
}

/// The caller's role in the room; non-members are rejected.
pub(crate) fn require_member(conn: &Connection, room_id: &str, user_id: &str) -> AppResult<RoomRole> {
    get_member_role(conn, room_id, user_id)?
        .ok_or_else(|| AppError::Forbidden("Not a room member".to_string()))
}

pub(crate) fn require_owner(conn: &Connection, room_id: &str, user_id: &str) -> AppResult<()> {
    match require_member(conn, room_id, user_id)? {
        RoomRole::Owner => Ok(()),
        RoomRole::Member => Err(AppError::Forbidden(
            "Only the room owner can do this".to_string(),
        )),
    }
}

pub(crate) fn webhook_urls(conn: &Connection, room_id: &str) -> AppResult<Vec<String>> {
    Ok(list_webhooks(conn, room_id)?.into_iter().map(|w| w.url).collect())
}

/// Trims a user-supplied text field, rejecting it when nothing is left.
pub(crate) fn required_text(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Turns an empty optional text field into `None`.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
