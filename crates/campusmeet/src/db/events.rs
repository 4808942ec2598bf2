/// Events, per-candidate votes and public event attendance
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::conflict_on_duplicate;
use super::types::{DbAttendee, DbEvent};
use crate::error::AppResult;
use crate::schedule::{VoteRecord, VoteValue};

const EVENT_COLUMNS: &str = "id, room_id, created_by, title, description, category, location, public, \
                             proposed_times_json, start_time, end_time, created_at, updated_at";

fn map_event(row: &Row<'_>) -> rusqlite::Result<DbEvent> {
    Ok(DbEvent {
        id: row.get(0)?,
        room_id: row.get(1)?,
        created_by: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        location: row.get(6)?,
        public: row.get(7)?,
        proposed_times_json: row.get(8)?,
        start_time: row.get(9)?,
        end_time: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

pub fn insert_event(conn: &Connection, event: &DbEvent) -> AppResult<()> {
    conn.execute(
        "INSERT INTO events (id, room_id, created_by, title, description, category, location, public,
                             proposed_times_json, start_time, end_time, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            event.id,
            event.room_id,
            event.created_by,
            event.title,
            event.description,
            event.category,
            event.location,
            event.public,
            event.proposed_times_json,
            event.start_time,
            event.end_time,
            event.created_at,
            event.updated_at
        ],
    )?;
    Ok(())
}

pub fn get_event(conn: &Connection, event_id: &str) -> AppResult<Option<DbEvent>> {
    let event = conn
        .query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
            [event_id],
            map_event,
        )
        .optional()?;
    Ok(event)
}

/// Events of a room, newest first, optionally capped.
pub fn list_room_events(conn: &Connection, room_id: &str, limit: Option<u32>) -> AppResult<Vec<DbEvent>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE room_id = ?1 ORDER BY rowid DESC LIMIT ?2"
    ))?;
    // SQLite treats a negative LIMIT as no limit.
    let limit = limit.map(i64::from).unwrap_or(-1);
    let events = stmt
        .query_map(params![room_id, limit], map_event)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

/// All public events with optional exact category match, newest first.
pub fn list_public_events(conn: &Connection, category: Option<&str>) -> AppResult<Vec<DbEvent>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE public = 1 AND (?1 IS NULL OR category = ?1)
         ORDER BY rowid DESC"
    ))?;
    let events = stmt
        .query_map(params![category], map_event)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

pub fn delete_event(conn: &Connection, event_id: &str) -> AppResult<bool> {
    let changed = conn.execute("DELETE FROM events WHERE id = ?1", [event_id])?;
    Ok(changed > 0)
}

/// Inserts the vote or overwrites the value stored under the same key.
///
/// The primary key on (event_id, user_id, time_index) makes this a single atomic write.
pub fn upsert_vote(
    conn: &Connection,
    event_id: &str,
    user_id: &str,
    time_index: usize,
    vote: VoteValue,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO event_votes (event_id, user_id, time_index, vote, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(event_id, user_id, time_index)
         DO UPDATE SET vote = excluded.vote, updated_at = excluded.updated_at",
        params![event_id, user_id, time_index as i64, vote, Utc::now()],
    )?;
    Ok(())
}

/// Every vote on the event with the voter's name, in first-vote order.
pub fn list_votes(conn: &Connection, event_id: &str) -> AppResult<Vec<VoteRecord>> {
    let mut stmt = conn.prepare(
        "SELECT v.user_id, u.name, v.time_index, v.vote
         FROM event_votes v
         LEFT JOIN users u ON u.id = v.user_id
         WHERE v.event_id = ?1
         ORDER BY v.rowid",
    )?;
    let votes = stmt
        .query_map([event_id], |row| {
            Ok(VoteRecord {
                user_id: row.get(0)?,
                name: row.get(1)?,
                time_index: row.get::<_, i64>(2)?.max(0) as usize,
                vote: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(votes)
}

/// Adds the user to the attendee list. A second join is a conflict.
pub fn insert_attendee(conn: &Connection, event_id: &str, user_id: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO event_attendees (event_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
        params![event_id, user_id, Utc::now()],
    )
    .map_err(|e| conflict_on_duplicate(e, "Already joined"))?;
    Ok(())
}

pub fn remove_attendee(conn: &Connection, event_id: &str, user_id: &str) -> AppResult<bool> {
    let changed = conn.execute(
        "DELETE FROM event_attendees WHERE event_id = ?1 AND user_id = ?2",
        params![event_id, user_id],
    )?;
    Ok(changed > 0)
}

pub fn list_attendees(conn: &Connection, event_id: &str) -> AppResult<Vec<DbAttendee>> {
    let mut stmt = conn.prepare(
        "SELECT a.user_id, u.name, u.school, a.joined_at
         FROM event_attendees a
         LEFT JOIN users u ON u.id = a.user_id
         WHERE a.event_id = ?1
         ORDER BY a.rowid",
    )?;
    let attendees = stmt
        .query_map([event_id], |row| {
            Ok(DbAttendee {
                user_id: row.get(0)?,
                name: row.get(1)?,
                school: row.get(2)?,
                joined_at: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(attendees)
}
