/// Per-user weekly timetables
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::types::DbTimetable;
use crate::error::AppResult;

fn map_timetable(row: &Row<'_>) -> rusqlite::Result<DbTimetable> {
    Ok(DbTimetable {
        id: row.get(0)?,
        user_id: row.get(1)?,
        data_json: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub fn get_timetable(conn: &Connection, user_id: &str) -> AppResult<Option<DbTimetable>> {
    let timetable = conn
        .query_row(
            "SELECT id, user_id, data_json, created_at, updated_at FROM timetables WHERE user_id = ?1",
            [user_id],
            map_timetable,
        )
        .optional()?;
    Ok(timetable)
}

/// Inserts or replaces the user's single timetable row.
pub fn upsert_timetable(conn: &Connection, user_id: &str, data_json: &str) -> AppResult<DbTimetable> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO timetables (user_id, data_json, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(user_id) DO UPDATE SET data_json = excluded.data_json, updated_at = excluded.updated_at",
        params![user_id, data_json, now],
    )?;

    let timetable = conn.query_row(
        "SELECT id, user_id, data_json, created_at, updated_at FROM timetables WHERE user_id = ?1",
        [user_id],
        map_timetable,
    )?;
    Ok(timetable)
}

/// Creates an empty timetable unless one exists, then returns the stored row.
pub fn get_or_create_timetable(conn: &Connection, user_id: &str) -> AppResult<DbTimetable> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO timetables (user_id, data_json, created_at, updated_at) VALUES (?1, '{}', ?2, ?2)
         ON CONFLICT(user_id) DO NOTHING",
        params![user_id, now],
    )?;
    get_timetable(conn, user_id)?.ok_or_else(|| crate::error::AppError::not_found("Timetable"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::{insert_user, NewUser};
    use crate::db::Database;

    fn seed(db: &Database) {
        db.transaction(|tx| {
            insert_user(
                tx,
                &NewUser { id: "u1", email: "u1@x.io", name: None, school: None, major: None },
            )
        })
        .unwrap();
    }

    #[test]
    fn test_one_row_per_user() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let first = db.transaction(|tx| upsert_timetable(tx, "u1", r#"{"monday":[]}"#)).unwrap();
        let second = db
            .transaction(|tx| upsert_timetable(tx, "u1", r#"{"friday":[]}"#))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.data_json, r#"{"friday":[]}"#);
    }

    #[test]
    fn test_lazy_creation_keeps_existing_data() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let created = db.transaction(|tx| get_or_create_timetable(tx, "u1")).unwrap();
        assert_eq!(created.data_json, "{}");

        db.transaction(|tx| upsert_timetable(tx, "u1", r#"{"monday":[]}"#)).unwrap();
        let again = db.transaction(|tx| get_or_create_timetable(tx, "u1")).unwrap();
        assert_eq!(again.id, created.id);
        assert_eq!(again.data_json, r#"{"monday":[]}"#);
    }
}
