//! CampusMeet: timetables, shared free periods, rooms with voted events, public events
//! and Discord/email notifications behind a JSON API.

pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod notify;
pub mod schedule;
pub mod security;
pub mod server;
pub mod services;
pub mod types;
