/// Queries on the users table
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::conflict_on_duplicate;
use super::types::DbUser;
use crate::error::AppResult;

const USER_COLUMNS: &str =
    "id, email, name, school, major, is_active, email_verified, is_admin, created_at, updated_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<DbUser> {
    Ok(DbUser {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        school: row.get(3)?,
        major: row.get(4)?,
        is_active: row.get(5)?,
        email_verified: row.get(6)?,
        is_admin: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub struct NewUser<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub name: Option<&'a str>,
    pub school: Option<&'a str>,
    pub major: Option<&'a str>,
}

/// Inserts a verified-pending, active, non-admin user. A taken email is a conflict.
pub fn insert_user(conn: &Connection, user: &NewUser<'_>) -> AppResult<()> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO users (id, email, name, school, major, is_active, email_verified, is_admin, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, 0, 0, ?6, ?6)",
        params![user.id, user.email, user.name, user.school, user.major, now],
    )
    .map_err(|e| conflict_on_duplicate(e, "Email already registered"))?;
    Ok(())
}

pub fn get_user(conn: &Connection, user_id: &str) -> AppResult<Option<DbUser>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [user_id],
            map_user,
        )
        .optional()?;
    Ok(user)
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> AppResult<Option<DbUser>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            [email],
            map_user,
        )
        .optional()?;
    Ok(user)
}

/// Page of users, newest first, plus the total count.
pub fn list_users(conn: &Connection, skip: u32, limit: u32) -> AppResult<(Vec<DbUser>, u64)> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY rowid DESC LIMIT ?1 OFFSET ?2"
    ))?;
    let users = stmt
        .query_map(params![limit, skip], map_user)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok((users, total.max(0) as u64))
}

pub fn set_email_verified(conn: &Connection, email: &str) -> AppResult<bool> {
    let changed = conn.execute(
        "UPDATE users SET email_verified = 1, updated_at = ?2 WHERE email = ?1",
        params![email, Utc::now()],
    )?;
    Ok(changed > 0)
}

/// Writes back the mutable profile and flag columns of `user`.
pub fn update_user(conn: &Connection, user: &DbUser) -> AppResult<()> {
    conn.execute(
        "UPDATE users SET name = ?2, school = ?3, major = ?4, is_active = ?5, is_admin = ?6, updated_at = ?7
         WHERE id = ?1",
        params![
            user.id,
            user.name,
            user.school,
            user.major,
            user.is_active,
            user.is_admin,
            Utc::now()
        ],
    )?;
    Ok(())
}

pub fn delete_user(conn: &Connection, user_id: &str) -> AppResult<bool> {
    let changed = conn.execute("DELETE FROM users WHERE id = ?1", [user_id])?;
    Ok(changed > 0)
}
