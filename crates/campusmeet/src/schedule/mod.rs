//! Availability and voting engine.
//!
//! Everything in here is pure: the callers fetch rows from the store and hand the
//! decoded values to these functions.

mod periods;
mod timetable;
mod votes;

pub use periods::{default_periods, is_valid_clock_time, resolve_periods, PeriodDefinition};
pub use timetable::{free_slots, occupied_periods, CourseSlot, FreeSlot, WeeklyTimetable, WEEKDAYS};
pub use votes::{tally, tally_by_candidate, CandidateTally, ProposedTime, VoteRecord, VoteStats, VoteValue};
