pub mod admin;
pub mod auth;
pub mod calendar;
pub mod events;
pub mod rooms;
pub mod status;
pub mod timetable;
pub mod users;
pub mod webhooks;
