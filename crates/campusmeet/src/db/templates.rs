/// Period grid templates
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::types::{DbTemplate, TemplateStatus};
use crate::error::AppResult;

const TEMPLATE_COLUMNS: &str = "id, school, name, periods_json, created_by, status, submitted_at, \
                                reviewed_at, reviewed_by, created_at, updated_at";

fn map_template(row: &Row<'_>) -> rusqlite::Result<DbTemplate> {
    Ok(DbTemplate {
        id: row.get(0)?,
        school: row.get(1)?,
        name: row.get(2)?,
        periods_json: row.get(3)?,
        created_by: row.get(4)?,
        status: row.get(5)?,
        submitted_at: row.get(6)?,
        reviewed_at: row.get(7)?,
        reviewed_by: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Stores a template and returns its id.
pub fn insert_template(
    conn: &Connection,
    school: &str,
    name: &str,
    periods_json: &str,
    created_by: Option<&str>,
    status: TemplateStatus,
) -> AppResult<i64> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO timetable_templates (school, name, periods_json, created_by, status, submitted_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?6)",
        params![school, name, periods_json, created_by, status, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_template(conn: &Connection, id: i64) -> AppResult<Option<DbTemplate>> {
    let template = conn
        .query_row(
            &format!("SELECT {TEMPLATE_COLUMNS} FROM timetable_templates WHERE id = ?1"),
            [id],
            map_template,
        )
        .optional()?;
    Ok(template)
}

/// Templates with the given status, most recently submitted first.
pub fn list_templates(conn: &Connection, status: TemplateStatus) -> AppResult<Vec<DbTemplate>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TEMPLATE_COLUMNS} FROM timetable_templates WHERE status = ?1 ORDER BY id DESC"
    ))?;
    let templates = stmt
        .query_map([status], map_template)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(templates)
}

/// Records a review decision. Returns false when the template does not exist.
pub fn set_template_status(
    conn: &Connection,
    id: i64,
    status: TemplateStatus,
    reviewer_id: &str,
) -> AppResult<bool> {
    let now = Utc::now();
    let changed = conn.execute(
        "UPDATE timetable_templates SET status = ?2, reviewed_at = ?3, reviewed_by = ?4, updated_at = ?3
         WHERE id = ?1",
        params![id, status, now, reviewer_id],
    )?;
    Ok(changed > 0)
}
