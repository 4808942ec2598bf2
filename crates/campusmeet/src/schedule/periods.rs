/// Period grids: the built-in default and template resolution
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::db::types::{DbTemplate, TemplateStatus};

static CLOCK_TIME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("static regex"));

/// One named slot of a school day, e.g. period "3" from 10:10 to 11:00.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDefinition {
    pub name: String,
    pub start: String,
    pub end: String,
}

impl PeriodDefinition {
    pub fn new(name: &str, start: &str, end: &str) -> Self {
        Self {
            name: name.to_string(),
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

/// The grid used whenever no approved template applies.
///
/// Clients depend on these exact values.
pub fn default_periods() -> Vec<PeriodDefinition> {
    vec![
        PeriodDefinition::new("1", "08:10", "09:00"),
        PeriodDefinition::new("2", "09:10", "10:00"),
        PeriodDefinition::new("3", "10:10", "11:00"),
        PeriodDefinition::new("4", "11:10", "12:00"),
        PeriodDefinition::new("5", "13:10", "14:00"),
        PeriodDefinition::new("6", "14:10", "15:00"),
        PeriodDefinition::new("7", "15:10", "16:00"),
        PeriodDefinition::new("8", "16:10", "17:00"),
    ]
}

/// Picks the grid for a request.
///
/// An approved template wins; a missing, pending or rejected one silently falls back
/// to `default`. A template whose stored grid cannot be decoded also falls back.
pub fn resolve_periods(
    template: Option<&DbTemplate>,
    default: &[PeriodDefinition],
) -> Vec<PeriodDefinition> {
    match template {
        Some(t) if t.status == TemplateStatus::Approved => t
            .periods()
            .unwrap_or_else(|_| default.to_vec()),
        _ => default.to_vec(),
    }
}

/// Returns true for a 24h `HH:MM` string.
pub fn is_valid_clock_time(value: &str) -> bool {
    CLOCK_TIME_REGEX.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn template(status: TemplateStatus, periods: &[PeriodDefinition]) -> DbTemplate {
        let now = Utc::now();
        DbTemplate {
            id: 7,
            school: "NTU".to_string(),
            name: "Main campus".to_string(),
            periods_json: serde_json::to_string(periods).unwrap(),
            created_by: None,
            status,
            submitted_at: now,
            reviewed_at: None,
            reviewed_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_default_grid_literals() {
        let grid = default_periods();
        assert_eq!(grid.len(), 8);
        assert_eq!(grid[0], PeriodDefinition::new("1", "08:10", "09:00"));
        assert_eq!(grid[3], PeriodDefinition::new("4", "11:10", "12:00"));
        assert_eq!(grid[4], PeriodDefinition::new("5", "13:10", "14:00"));
        assert_eq!(grid[7], PeriodDefinition::new("8", "16:10", "17:00"));
    }

    #[test]
    fn test_approved_template_keeps_stored_order() {
        let custom = vec![
            PeriodDefinition::new("B", "10:00", "11:00"),
            PeriodDefinition::new("A", "08:00", "09:00"),
        ];
        let t = template(TemplateStatus::Approved, &custom);
        assert_eq!(resolve_periods(Some(&t), &default_periods()), custom);
    }

    #[test]
    fn test_unapproved_or_missing_template_falls_back() {
        let custom = vec![PeriodDefinition::new("X", "07:00", "07:45")];
        let pending = template(TemplateStatus::Pending, &custom);
        let rejected = template(TemplateStatus::Rejected, &custom);

        assert_eq!(resolve_periods(Some(&pending), &default_periods()), default_periods());
        assert_eq!(resolve_periods(Some(&rejected), &default_periods()), default_periods());
        assert_eq!(resolve_periods(None, &default_periods()), default_periods());
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let custom = vec![PeriodDefinition::new("1", "08:00", "08:50")];
        let t = template(TemplateStatus::Approved, &custom);
        let first = resolve_periods(Some(&t), &default_periods());
        let second = resolve_periods(Some(&t), &default_periods());
        assert_eq!(first, second);
    }

    #[test]
    fn test_clock_time_format() {
        assert!(is_valid_clock_time("08:10"));
        assert!(is_valid_clock_time("23:59"));
        assert!(!is_valid_clock_time("8:10"));
        assert!(!is_valid_clock_time("24:00"));
        assert!(!is_valid_clock_time("12:60"));
    }
}
