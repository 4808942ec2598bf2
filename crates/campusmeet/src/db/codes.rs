/// One-time verification and login codes
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::types::CodePurpose;
use crate::error::AppResult;

pub fn insert_code(
    conn: &Connection,
    email: &str,
    purpose: CodePurpose,
    code_hash: &str,
    expires_at: DateTime<Utc>,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO verification_codes (email, purpose, code_hash, expires_at, used)
         VALUES (?1, ?2, ?3, ?4, 0)",
        params![email, purpose, code_hash, expires_at],
    )?;
    Ok(())
}

/// Marks every unused code of `email` for `purpose` as used. Returns how many.
pub fn invalidate_unused(conn: &Connection, email: &str, purpose: CodePurpose) -> AppResult<usize> {
    let changed = conn.execute(
        "UPDATE verification_codes SET used = 1 WHERE email = ?1 AND purpose = ?2 AND used = 0",
        params![email, purpose],
    )?;
    Ok(changed)
}

/// Consumes a matching unused code that has not expired at `now`.
///
/// Returns false when no such code exists; nothing is written in that case.
pub fn consume_code(
    conn: &Connection,
    email: &str,
    purpose: CodePurpose,
    code_hash: &str,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let mut stmt = conn.prepare(
        "SELECT id, expires_at FROM verification_codes
         WHERE email = ?1 AND purpose = ?2 AND code_hash = ?3 AND used = 0
         ORDER BY id DESC",
    )?;
    let candidates = stmt
        .query_map(params![email, purpose, code_hash], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, DateTime<Utc>>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let Some((id, _)) = candidates.into_iter().find(|(_, expires_at)| *expires_at > now) else {
        return Ok(false);
    };

    conn.execute("UPDATE verification_codes SET used = 1 WHERE id = ?1", [id])?;
    Ok(true)
}
