/// Rooms, room membership and room webhooks
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::conflict_on_duplicate;
use super::types::{DbRoom, DbRoomMember, DbWebhook, RoomRole};
use crate::error::AppResult;

const ROOM_COLUMNS: &str = "id, name, owner_id, school, invite_code, created_at, updated_at";

fn map_room(row: &Row<'_>) -> rusqlite::Result<DbRoom> {
    Ok(DbRoom {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
        school: row.get(3)?,
        invite_code: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn map_webhook(row: &Row<'_>) -> rusqlite::Result<DbWebhook> {
    Ok(DbWebhook {
        id: row.get(0)?,
        room_id: row.get(1)?,
        url: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Inserts the room row. Returns the raw error so callers can retry on an invite code
/// collision.
pub fn insert_room(conn: &Connection, room: &DbRoom) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO rooms (id, name, owner_id, school, invite_code, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            room.id,
            room.name,
            room.owner_id,
            room.school,
            room.invite_code,
            room.created_at,
            room.updated_at
        ],
    )?;
    Ok(())
}

pub fn get_room(conn: &Connection, room_id: &str) -> AppResult<Option<DbRoom>> {
    let room = conn
        .query_row(
            &format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?1"),
            [room_id],
            map_room,
        )
        .optional()?;
    Ok(room)
}

pub fn get_room_by_invite_code(conn: &Connection, code: &str) -> AppResult<Option<DbRoom>> {
    let room = conn
        .query_row(
            &format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE invite_code = ?1"),
            [code],
            map_room,
        )
        .optional()?;
    Ok(room)
}

/// Replaces the invite code. Raw error for the same reason as [`insert_room`].
pub fn set_invite_code(conn: &Connection, room_id: &str, code: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE rooms SET invite_code = ?2, updated_at = ?3 WHERE id = ?1",
        params![room_id, code, Utc::now()],
    )?;
    Ok(())
}

pub fn delete_room(conn: &Connection, room_id: &str) -> AppResult<bool> {
    let changed = conn.execute("DELETE FROM rooms WHERE id = ?1", [room_id])?;
    Ok(changed > 0)
}

/// Rooms the user belongs to, in the order they joined.
pub fn list_rooms_for_user(conn: &Connection, user_id: &str) -> AppResult<Vec<DbRoom>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.name, r.owner_id, r.school, r.invite_code, r.created_at, r.updated_at
         FROM rooms r
         JOIN room_members m ON m.room_id = r.id
         WHERE m.user_id = ?1
         ORDER BY m.rowid",
    )?;
    let rooms = stmt
        .query_map([user_id], map_room)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rooms)
}

/// Adds a membership row. An existing membership is a conflict.
pub fn add_member(conn: &Connection, room_id: &str, user_id: &str, role: RoomRole) -> AppResult<()> {
    conn.execute(
        "INSERT INTO room_members (room_id, user_id, role, joined_at) VALUES (?1, ?2, ?3, ?4)",
        params![room_id, user_id, role, Utc::now()],
    )
    .map_err(|e| conflict_on_duplicate(e, "Already a member of this room"))?;
    Ok(())
}

pub fn remove_member(conn: &Connection, room_id: &str, user_id: &str) -> AppResult<bool> {
    let changed = conn.execute(
        "DELETE FROM room_members WHERE room_id = ?1 AND user_id = ?2",
        params![room_id, user_id],
    )?;
    Ok(changed > 0)
}

pub fn get_member_role(conn: &Connection, room_id: &str, user_id: &str) -> AppResult<Option<RoomRole>> {
    let role = conn
        .query_row(
            "SELECT role FROM room_members WHERE room_id = ?1 AND user_id = ?2",
            params![room_id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(role)
}

/// Members with their display names, in join order.
pub fn list_members(conn: &Connection, room_id: &str) -> AppResult<Vec<DbRoomMember>> {
    let mut stmt = conn.prepare(
        "SELECT m.user_id, u.name, m.role, m.joined_at
         FROM room_members m
         LEFT JOIN users u ON u.id = m.user_id
         WHERE m.room_id = ?1
         ORDER BY m.rowid",
    )?;
    let members = stmt
        .query_map([room_id], |row| {
            Ok(DbRoomMember {
                user_id: row.get(0)?,
                name: row.get(1)?,
                role: row.get(2)?,
                joined_at: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(members)
}

pub fn insert_webhook(conn: &Connection, webhook: &DbWebhook) -> AppResult<()> {
    conn.execute(
        "INSERT INTO room_webhooks (id, room_id, url, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![webhook.id, webhook.room_id, webhook.url, webhook.created_at],
    )?;
    Ok(())
}

pub fn list_webhooks(conn: &Connection, room_id: &str) -> AppResult<Vec<DbWebhook>> {
    let mut stmt = conn.prepare(
        "SELECT id, room_id, url, created_at FROM room_webhooks WHERE room_id = ?1 ORDER BY rowid",
    )?;
    let webhooks = stmt
        .query_map([room_id], map_webhook)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(webhooks)
}

/// Removes a webhook only if it belongs to `room_id`.
pub fn delete_webhook(conn: &Connection, room_id: &str, webhook_id: &str) -> AppResult<bool> {
    let changed = conn.execute(
        "DELETE FROM room_webhooks WHERE id = ?1 AND room_id = ?2",
        params![webhook_id, room_id],
    )?;
    Ok(changed > 0)
}
