/// Weekly timetables and free period computation
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::periods::PeriodDefinition;

/// Accepted weekday keys, in week order.
pub const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// A course placed into one period of a day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSlot {
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub course: String,
    /// Free-form fields such as room or instructor.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// A user's week: lowercase weekday name to that day's courses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<CourseSlot>>")]
pub struct WeeklyTimetable(BTreeMap<String, Vec<CourseSlot>>);

impl WeeklyTimetable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Courses for a weekday, looked up case-insensitively.
    pub fn day(&self, weekday: &str) -> &[CourseSlot] {
        self.0
            .get(&weekday.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replaces one day's courses. Unknown weekday names are rejected.
    pub fn set_day(&mut self, weekday: &str, courses: Vec<CourseSlot>) -> Result<(), String> {
        let key = weekday.to_lowercase();
        if !WEEKDAYS.contains(&key.as_str()) {
            return Err(format!("Unknown weekday: {weekday}"));
        }
        self.0.insert(key, courses);
        Ok(())
    }
}

impl TryFrom<BTreeMap<String, Vec<CourseSlot>>> for WeeklyTimetable {
    type Error = String;

    fn try_from(raw: BTreeMap<String, Vec<CourseSlot>>) -> Result<Self, Self::Error> {
        let mut timetable = WeeklyTimetable::new();
        for (day, courses) in raw {
            timetable.set_day(&day, courses)?;
        }
        Ok(timetable)
    }
}

/// A period with nothing scheduled in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlot {
    pub start: String,
    pub end: String,
}

impl From<&PeriodDefinition> for FreeSlot {
    fn from(p: &PeriodDefinition) -> Self {
        FreeSlot {
            start: p.start.clone(),
            end: p.end.clone(),
        }
    }
}

/// Names of the periods that hold a course on `weekday`.
///
/// Courses with an empty `period` occupy nothing.
pub fn occupied_periods<'a>(timetable: &'a WeeklyTimetable, weekday: &str) -> HashSet<&'a str> {
    timetable
        .day(weekday)
        .iter()
        .map(|c| c.period.as_str())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Periods of `periods` with no course on `weekday`, in grid order.
///
/// Occupancy is decided by period name only; clock times are never compared.
pub fn free_slots(
    timetable: Option<&WeeklyTimetable>,
    weekday: &str,
    periods: &[PeriodDefinition],
) -> Vec<FreeSlot> {
    let Some(timetable) = timetable else {
        return periods.iter().map(FreeSlot::from).collect();
    };

    let occupied = occupied_periods(timetable, weekday);
    periods
        .iter()
        .filter(|p| !occupied.contains(p.name.as_str()))
        .map(FreeSlot::from)
        .collect()
}
