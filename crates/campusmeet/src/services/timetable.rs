//! Timetables, period templates and free slot queries.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::required_text;
use crate::db::templates::{get_template, insert_template, list_templates, set_template_status};
use crate::db::timetables::{get_or_create_timetable, get_timetable, upsert_timetable};
use crate::db::types::{DbTemplate, DbTimetable, TemplateStatus};
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::schedule::{
    free_slots, is_valid_clock_time, resolve_periods, FreeSlot, PeriodDefinition, WeeklyTimetable,
};

#[derive(Debug, Serialize)]
pub struct TemplateView {
    pub id: i64,
    pub school: String,
    pub name: String,
    pub periods: Vec<PeriodDefinition>,
    pub created_by: Option<String>,
    pub status: TemplateStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbTemplate> for TemplateView {
    type Error = AppError;

    fn try_from(t: DbTemplate) -> Result<Self, Self::Error> {
        Ok(Self {
            periods: t.periods()?,
            id: t.id,
            school: t.school,
            name: t.name,
            created_by: t.created_by,
            status: t.status,
            submitted_at: t.submitted_at,
            reviewed_at: t.reviewed_at,
            reviewed_by: t.reviewed_by,
            created_at: t.created_at,
            updated_at: t.updated_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TemplateSubmission {
    pub school: String,
    pub name: String,
    pub periods: Vec<PeriodDefinition>,
}

#[derive(Debug, Serialize)]
pub struct TimetableView {
    pub id: i64,
    pub user_id: String,
    pub data: WeeklyTimetable,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbTimetable> for TimetableView {
    type Error = AppError;

    fn try_from(t: DbTimetable) -> Result<Self, Self::Error> {
        Ok(Self {
            data: t.data()?,
            id: t.id,
            user_id: t.user_id,
            created_at: t.created_at,
            updated_at: t.updated_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct FreeSlotsView {
    pub weekday: String,
    pub slots: Vec<FreeSlot>,
}

fn views(templates: Vec<DbTemplate>) -> AppResult<Vec<TemplateView>> {
    templates.into_iter().map(TemplateView::try_from).collect()
}

fn validate_periods(periods: &[PeriodDefinition]) -> AppResult<()> {
    if periods.is_empty() {
        return Err(AppError::Validation("periods must not be empty".to_string()));
    }
    for p in periods {
        if p.name.trim().is_empty() {
            return Err(AppError::Validation("period name must not be empty".to_string()));
        }
        if !is_valid_clock_time(&p.start) || !is_valid_clock_time(&p.end) {
            return Err(AppError::Validation(format!(
                "period {} must use HH:MM times",
                p.name
            )));
        }
    }
    Ok(())
}

fn store_template(
    db: &Database,
    submission: &TemplateSubmission,
    created_by: &str,
    status: TemplateStatus,
) -> AppResult<TemplateView> {
    let school = required_text(&submission.school, "school")?;
    let name = required_text(&submission.name, "name")?;
    validate_periods(&submission.periods)?;
    let periods_json = serde_json::to_string(&submission.periods)?;

    let template = db.transaction(|tx| {
        let id = insert_template(tx, &school, &name, &periods_json, Some(created_by), status)?;
        get_template(tx, id)?.ok_or_else(|| AppError::not_found("Template"))
    })?;
    info!("Stored {} template {} for {}", status.as_str(), template.id, template.school);
    TemplateView::try_from(template)
}

/// Grid for a request: the approved template named by `template_id`, else `default`.
pub(crate) fn periods_for(
    conn: &Connection,
    template_id: Option<i64>,
    default: &[PeriodDefinition],
) -> AppResult<Vec<PeriodDefinition>> {
    let template = match template_id {
        Some(id) => get_template(conn, id)?,
        None => None,
    };
    Ok(resolve_periods(template.as_ref(), default))
}

/// Templates visible to every user.
pub fn approved_templates(db: &Database) -> AppResult<Vec<TemplateView>> {
    views(db.transaction(|tx| list_templates(tx, TemplateStatus::Approved))?)
}

pub fn pending_templates(db: &Database) -> AppResult<Vec<TemplateView>> {
    views(db.transaction(|tx| list_templates(tx, TemplateStatus::Pending))?)
}

/// A user proposal, stored as pending until an admin reviews it.
pub fn submit_template(db: &Database, user_id: &str, submission: &TemplateSubmission) -> AppResult<TemplateView> {
    store_template(db, submission, user_id, TemplateStatus::Pending)
}

/// Admin-authored template, usable immediately.
pub fn create_approved_template(
    db: &Database,
    admin_id: &str,
    submission: &TemplateSubmission,
) -> AppResult<TemplateView> {
    store_template(db, submission, admin_id, TemplateStatus::Approved)
}

/// Approves or rejects a template. Only `approved` and `rejected` are accepted.
pub fn review_template(db: &Database, admin_id: &str, template_id: i64, status: &str) -> AppResult<TemplateView> {
    let status = match status.parse::<TemplateStatus>() {
        Ok(s @ (TemplateStatus::Approved | TemplateStatus::Rejected)) => s,
        _ => {
            return Err(AppError::Validation(
                "Status must be 'approved' or 'rejected'".to_string(),
            ))
        }
    };

    let template = db.transaction(|tx| {
        if !set_template_status(tx, template_id, status, admin_id)? {
            return Err(AppError::not_found("Template"));
        }
        get_template(tx, template_id)?.ok_or_else(|| AppError::not_found("Template"))
    })?;
    TemplateView::try_from(template)
}

/// The user's timetable, created empty on first access.
pub fn get_user_timetable(db: &Database, user_id: &str) -> AppResult<TimetableView> {
    TimetableView::try_from(db.transaction(|tx| get_or_create_timetable(tx, user_id))?)
}

pub fn save_user_timetable(db: &Database, user_id: &str, data: &WeeklyTimetable) -> AppResult<TimetableView> {
    let data_json = serde_json::to_string(data)?;
    TimetableView::try_from(db.transaction(|tx| upsert_timetable(tx, user_id, &data_json))?)
}

/// Free periods of one user on `weekday`.
pub fn user_free_slots(
    db: &Database,
    user_id: &str,
    weekday: &str,
    template_id: Option<i64>,
    default: &[PeriodDefinition],
) -> AppResult<FreeSlotsView> {
    let (timetable, periods) = db.transaction(|tx| {
        let timetable = get_timetable(tx, user_id)?.map(|t| t.data()).transpose()?;
        Ok((timetable, periods_for(tx, template_id, default)?))
    })?;

    Ok(FreeSlotsView {
        weekday: weekday.to_string(),
        slots: free_slots(timetable.as_ref(), weekday, &periods),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{default_periods, CourseSlot};
    use crate::services::testing::verified_user;

    fn submission(periods: Vec<PeriodDefinition>) -> TemplateSubmission {
        TemplateSubmission {
            school: "NTU".to_string(),
            name: "Two periods".to_string(),
            periods,
        }
    }

    fn two_periods() -> Vec<PeriodDefinition> {
        vec![
            PeriodDefinition::new("A", "07:00", "08:00"),
            PeriodDefinition::new("B", "08:00", "09:00"),
        ]
    }

    #[test]
    fn test_pending_template_is_ignored_until_approved() {
        let db = Database::open_in_memory().unwrap();
        verified_user(&db, "ann", None);
        let default = default_periods();

        let pending = submit_template(&db, "ann", &submission(two_periods())).unwrap();
        assert_eq!(pending.status, TemplateStatus::Pending);
        assert!(approved_templates(&db).unwrap().is_empty());

        let slots = user_free_slots(&db, "ann", "monday", Some(pending.id), &default).unwrap();
        assert_eq!(slots.slots.len(), 8);

        review_template(&db, "ann", pending.id, "approved").unwrap();
        let slots = user_free_slots(&db, "ann", "monday", Some(pending.id), &default).unwrap();
        assert_eq!(slots.slots, vec![
            FreeSlot { start: "07:00".to_string(), end: "08:00".to_string() },
            FreeSlot { start: "08:00".to_string(), end: "09:00".to_string() },
        ]);

        // unknown ids fall back too
        assert_eq!(user_free_slots(&db, "ann", "monday", Some(999), &default).unwrap().slots.len(), 8);
    }

    #[test]
    fn test_review_rejects_other_statuses() {
        let db = Database::open_in_memory().unwrap();
        verified_user(&db, "ann", None);
        let t = submit_template(&db, "ann", &submission(two_periods())).unwrap();

        assert!(matches!(
            review_template(&db, "ann", t.id, "pending").unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            review_template(&db, "ann", 4242, "rejected").unwrap_err(),
            AppError::NotFound(_)
        ));
        assert_eq!(pending_templates(&db).unwrap().len(), 1);
    }

    #[test]
    fn test_template_validation() {
        let db = Database::open_in_memory().unwrap();
        verified_user(&db, "ann", None);
        assert!(submit_template(&db, "ann", &submission(Vec::new())).is_err());
        assert!(submit_template(
            &db,
            "ann",
            &submission(vec![PeriodDefinition::new("1", "8:10", "09:00")])
        )
        .is_err());
    }

    #[test]
    fn test_timetable_round_trip_and_free_slots() {
        let db = Database::open_in_memory().unwrap();
        verified_user(&db, "ann", None);

        let empty = get_user_timetable(&db, "ann").unwrap();
        assert_eq!(empty.data, WeeklyTimetable::new());

        let mut data = WeeklyTimetable::new();
        data.set_day(
            "monday",
            vec![CourseSlot { period: "3".to_string(), course: "Calc".to_string(), ..Default::default() }],
        )
        .unwrap();
        let saved = save_user_timetable(&db, "ann", &data).unwrap();
        assert_eq!(saved.id, empty.id);

        let free = user_free_slots(&db, "ann", "Monday", None, &default_periods()).unwrap();
        assert_eq!(free.weekday, "Monday");
        assert_eq!(free.slots.len(), 7);
        assert!(free.slots.iter().all(|s| s.start != "10:10"));
    }
}
