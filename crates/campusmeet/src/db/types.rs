/// Database row types
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::schedule::{PeriodDefinition, ProposedTime, VoteValue, WeeklyTimetable};

/// Implements text-column conversions for enums with `as_str` and `FromStr`.
macro_rules! text_column {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    Pending,
    Approved,
    Rejected,
}

impl TemplateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateStatus::Pending => "pending",
            TemplateStatus::Approved => "approved",
            TemplateStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for TemplateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TemplateStatus::Pending),
            "approved" => Ok(TemplateStatus::Approved),
            "rejected" => Ok(TemplateStatus::Rejected),
            other => Err(format!("Unknown template status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomRole {
    Owner,
    Member,
}

impl RoomRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomRole::Owner => "owner",
            RoomRole::Member => "member",
        }
    }
}

impl FromStr for RoomRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(RoomRole::Owner),
            "member" => Ok(RoomRole::Member),
            other => Err(format!("Unknown room role: {other}")),
        }
    }
}

/// What a one-time code was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePurpose {
    VerifyEmail,
    Login,
}

impl CodePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodePurpose::VerifyEmail => "verify",
            CodePurpose::Login => "login",
        }
    }
}

impl FromStr for CodePurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verify" => Ok(CodePurpose::VerifyEmail),
            "login" => Ok(CodePurpose::Login),
            other => Err(format!("Unknown code purpose: {other}")),
        }
    }
}

text_column!(TemplateStatus);
text_column!(RoomRole);
text_column!(CodePurpose);
text_column!(VoteValue);

#[derive(Debug, Clone, Serialize)]
pub struct DbUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub school: Option<String>,
    pub major: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbUser {
    /// Name if set, otherwise the email address.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone)]
pub struct DbTemplate {
    pub id: i64,
    pub school: String,
    pub name: String,
    pub periods_json: String, // JSON array of PeriodDefinition
    pub created_by: Option<String>,
    pub status: TemplateStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbTemplate {
    pub fn periods(&self) -> Result<Vec<PeriodDefinition>, serde_json::Error> {
        serde_json::from_str(&self.periods_json)
    }
}

#[derive(Debug, Clone)]
pub struct DbTimetable {
    pub id: i64,
    pub user_id: String,
    pub data_json: String, // JSON object keyed by weekday
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbTimetable {
    pub fn data(&self) -> Result<WeeklyTimetable, serde_json::Error> {
        serde_json::from_str(&self.data_json)
    }
}

#[derive(Debug, Clone)]
pub struct DbRoom {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub school: Option<String>,
    pub invite_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DbRoomMember {
    pub user_id: String,
    pub name: Option<String>,
    pub role: RoomRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DbWebhook {
    pub id: String,
    pub room_id: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DbEvent {
    pub id: String,
    pub room_id: Option<String>,
    pub created_by: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub public: bool,
    pub proposed_times_json: Option<String>, // JSON array of ProposedTime
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbEvent {
    /// Candidate times of a private event; empty for public events.
    pub fn proposed_times(&self) -> Result<Vec<ProposedTime>, serde_json::Error> {
        match &self.proposed_times_json {
            Some(json) => serde_json::from_str(json),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbAttendee {
    pub user_id: String,
    pub name: Option<String>,
    pub school: Option<String>,
    pub joined_at: DateTime<Utc>,
}
