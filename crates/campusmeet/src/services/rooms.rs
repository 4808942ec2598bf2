//! Rooms, membership, invite codes and room webhooks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use super::events::EventView;
use super::timetable::periods_for;
use super::{
    optional_text, require_member, require_owner, require_room, required_text, webhook_urls,
    WithNotices,
};
use crate::db::events::list_room_events;
use crate::db::is_unique_violation;
use crate::db::rooms::{
    add_member, delete_room, delete_webhook, insert_room, insert_webhook, list_members,
    list_rooms_for_user, list_webhooks, remove_member, get_room_by_invite_code, set_invite_code,
};
use crate::db::timetables::get_timetable;
use crate::db::types::{DbRoom, DbRoomMember, DbUser, DbWebhook, RoomRole};
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::notify::{room_invite_email, DiscordPayload, Notification};
use crate::schedule::{free_slots, FreeSlot, PeriodDefinition};
use crate::security::generate_invite_code;

const INVITE_CODE_ATTEMPTS: usize = 5;
const RECENT_EVENTS: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct RoomRequest {
    pub name: String,
    pub school: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RoomView {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub school: Option<String>,
    /// Only present for the owner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    pub role: RoomRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomView {
    fn new(room: DbRoom, role: RoomRole) -> Self {
        Self {
            invite_code: room.invite_code.filter(|_| role == RoomRole::Owner),
            id: room.id,
            name: room.name,
            owner_id: room.owner_id,
            school: room.school,
            role,
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberView {
    pub user_id: String,
    pub name: Option<String>,
    pub role: RoomRole,
    pub joined_at: DateTime<Utc>,
}

impl From<DbRoomMember> for MemberView {
    fn from(m: DbRoomMember) -> Self {
        Self {
            user_id: m.user_id,
            name: m.name,
            role: m.role,
            joined_at: m.joined_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoomDetail {
    #[serde(flatten)]
    pub room: RoomView,
    pub members: Vec<MemberView>,
    pub recent_events: Vec<EventView>,
}

#[derive(Debug, Serialize)]
pub struct InviteCodeView {
    pub room_id: String,
    pub invite_code: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookView {
    pub id: String,
    pub room_id: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbWebhook> for WebhookView {
    fn from(w: DbWebhook) -> Self {
        Self {
            id: w.id,
            room_id: w.room_id,
            url: w.url,
            created_at: w.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberFreeSlots {
    pub user_id: String,
    pub name: Option<String>,
    pub slots: Vec<FreeSlot>,
}

#[derive(Debug, Serialize)]
pub struct RoomFreeSlots {
    pub weekday: String,
    pub members: Vec<MemberFreeSlots>,
}

/// Runs `write` with fresh invite codes until one does not collide.
fn with_fresh_invite_code(mut write: impl FnMut(&str) -> rusqlite::Result<()>) -> AppResult<String> {
    for attempt in 1..=INVITE_CODE_ATTEMPTS {
        let code = generate_invite_code();
        match write(&code) {
            Ok(()) => return Ok(code),
            Err(e) if is_unique_violation(&e) => {
                warn!("Invite code collision (attempt {}/{})", attempt, INVITE_CODE_ATTEMPTS);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::Internal(
        "Could not generate a unique invite code".to_string(),
    ))
}

/// Creates a room owned by `owner`, with a fresh invite code.
pub fn create_room(db: &Database, owner: &DbUser, req: &RoomRequest) -> AppResult<RoomView> {
    let name = required_text(&req.name, "name")?;
    let now = Utc::now();
    let mut room = DbRoom {
        id: Uuid::new_v4().to_string(),
        name,
        owner_id: owner.id.clone(),
        school: optional_text(req.school.as_deref()).or_else(|| owner.school.clone()),
        invite_code: None,
        created_at: now,
        updated_at: now,
    };

    let code = db.transaction(|tx| {
        let code = with_fresh_invite_code(|code| {
            insert_room(
                tx,
                &DbRoom {
                    invite_code: Some(code.to_string()),
                    ..room.clone()
                },
            )
        })?;
        add_member(tx, &room.id, &owner.id, RoomRole::Owner)?;
        Ok(code)
    })?;

    room.invite_code = Some(code);
    info!("User {} created room {}", owner.id, room.id);
    Ok(RoomView::new(room, RoomRole::Owner))
}

pub fn my_rooms(db: &Database, user_id: &str) -> AppResult<Vec<RoomView>> {
    db.transaction(|tx| {
        list_rooms_for_user(tx, user_id)?
            .into_iter()
            .map(|room| {
                let role = require_member(tx, &room.id, user_id)?;
                Ok(RoomView::new(room, role))
            })
            .collect()
    })
}

/// Room with its members and latest events. Members only.
pub fn room_detail(db: &Database, room_id: &str, user_id: &str) -> AppResult<RoomDetail> {
    let (room, role, members, events) = db.transaction(|tx| {
        let room = require_room(tx, room_id)?;
        let role = require_member(tx, room_id, user_id)?;
        let members = list_members(tx, room_id)?;
        let events = list_room_events(tx, room_id, Some(RECENT_EVENTS))?;
        Ok((room, role, members, events))
    })?;

    Ok(RoomDetail {
        room: RoomView::new(room, role),
        members: members.into_iter().map(MemberView::from).collect(),
        recent_events: events
            .into_iter()
            .map(EventView::try_from)
            .collect::<AppResult<_>>()?,
    })
}

/// Deletes the room with its memberships, events and webhooks. Owner only.
pub fn remove_room(db: &Database, room_id: &str, user_id: &str) -> AppResult<()> {
    db.transaction(|tx| {
        require_room(tx, room_id)?;
        require_owner(tx, room_id, user_id)?;
        delete_room(tx, room_id)?;
        Ok(())
    })?;
    info!("Deleted room {}", room_id);
    Ok(())
}

/// Mails the room's invite code to `email`. Owner only.
pub fn invite_by_email(db: &Database, room_id: &str, inviter: &DbUser, email: &str) -> AppResult<WithNotices<()>> {
    let email = email.trim().to_lowercase();
    if !crate::security::is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }

    let room = db.transaction(|tx| {
        let room = require_room(tx, room_id)?;
        require_owner(tx, room_id, &inviter.id)?;
        Ok(room)
    })?;
    let code = room
        .invite_code
        .ok_or_else(|| AppError::Internal("Room has no invite code".to_string()))?;

    let message = room_invite_email(&email, inviter.display_name(), &room.name, &code);
    Ok(WithNotices::new(()).notify(Some(Notification::Email(message))))
}

pub fn invite_code(db: &Database, room_id: &str, user_id: &str) -> AppResult<InviteCodeView> {
    let room = db.transaction(|tx| {
        let room = require_room(tx, room_id)?;
        require_owner(tx, room_id, user_id)?;
        Ok(room)
    })?;
    Ok(InviteCodeView {
        room_id: room.id,
        invite_code: room.invite_code.unwrap_or_default(),
    })
}

/// Replaces the invite code; the old one stops working. Owner only.
pub fn regenerate_invite_code(db: &Database, room_id: &str, user_id: &str) -> AppResult<InviteCodeView> {
    let invite_code = db.transaction(|tx| {
        require_room(tx, room_id)?;
        require_owner(tx, room_id, user_id)?;
        with_fresh_invite_code(|code| set_invite_code(tx, room_id, code))
    })?;
    info!("Regenerated invite code of room {}", room_id);
    Ok(InviteCodeView {
        room_id: room_id.to_string(),
        invite_code,
    })
}

/// Joins the room the invite code belongs to.
pub fn join_room(db: &Database, user: &DbUser, code: &str) -> AppResult<WithNotices<RoomView>> {
    let code = code.trim().to_uppercase();

    let (room, urls) = db.transaction(|tx| {
        let room = get_room_by_invite_code(tx, &code)?
            .ok_or_else(|| AppError::Validation("Invalid invite code".to_string()))?;
        add_member(tx, &room.id, &user.id, RoomRole::Member)?;
        let urls = webhook_urls(tx, &room.id)?;
        Ok((room, urls))
    })?;

    info!("User {} joined room {}", user.id, room.id);
    let message = format!("{} joined {}", user.display_name(), room.name);
    Ok(WithNotices::new(RoomView::new(room, RoomRole::Member))
        .notify(Notification::room(urls, DiscordPayload::text(message))))
}

/// Leaves the room. The owner cannot leave.
pub fn leave_room(db: &Database, room_id: &str, user_id: &str) -> AppResult<()> {
    db.transaction(|tx| {
        require_room(tx, room_id)?;
        if require_member(tx, room_id, user_id)? == RoomRole::Owner {
            return Err(AppError::Forbidden("The owner cannot leave the room".to_string()));
        }
        remove_member(tx, room_id, user_id)?;
        Ok(())
    })
}

/// Registers a Discord webhook. Owner only; the URL must be http or https.
pub fn add_webhook(db: &Database, room_id: &str, user_id: &str, url: &str) -> AppResult<WebhookView> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| AppError::Validation(format!("Invalid webhook URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::Validation(
            "Webhook URL must use http or https".to_string(),
        ));
    }

    let webhook = DbWebhook {
        id: Uuid::new_v4().to_string(),
        room_id: room_id.to_string(),
        url: parsed.to_string(),
        created_at: Utc::now(),
    };
    db.transaction(|tx| {
        require_room(tx, room_id)?;
        require_owner(tx, room_id, user_id)?;
        insert_webhook(tx, &webhook)
    })?;
    Ok(webhook.into())
}

pub fn webhooks(db: &Database, room_id: &str, user_id: &str) -> AppResult<Vec<WebhookView>> {
    db.transaction(|tx| {
        require_room(tx, room_id)?;
        require_member(tx, room_id, user_id)?;
        Ok(list_webhooks(tx, room_id)?.into_iter().map(WebhookView::from).collect())
    })
}

pub fn remove_webhook(db: &Database, room_id: &str, webhook_id: &str, user_id: &str) -> AppResult<()> {
    db.transaction(|tx| {
        require_room(tx, room_id)?;
        require_owner(tx, room_id, user_id)?;
        if !delete_webhook(tx, room_id, webhook_id)? {
            return Err(AppError::not_found("Webhook"));
        }
        Ok(())
    })
}

/// Free periods of every member on `weekday`. Members only.
pub fn members_free_slots(
    db: &Database,
    room_id: &str,
    user_id: &str,
    weekday: &str,
    template_id: Option<i64>,
    default: &[PeriodDefinition],
) -> AppResult<RoomFreeSlots> {
    let members = db.transaction(|tx| {
        require_room(tx, room_id)?;
        require_member(tx, room_id, user_id)?;
        let periods = periods_for(tx, template_id, default)?;

        list_members(tx, room_id)?
            .into_iter()
            .map(|m| {
                let timetable = get_timetable(tx, &m.user_id)?.map(|t| t.data()).transpose()?;
                Ok(MemberFreeSlots {
                    slots: free_slots(timetable.as_ref(), weekday, &periods),
                    user_id: m.user_id,
                    name: m.name,
                })
            })
            .collect::<AppResult<Vec<_>>>()
    })?;

    Ok(RoomFreeSlots {
        weekday: weekday.to_string(),
        members,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{default_periods, CourseSlot, WeeklyTimetable};
    use crate::services::require_user;
    use crate::services::testing::verified_user;
    use crate::services::timetable::save_user_timetable;

    fn user(db: &Database, id: &str) -> DbUser {
        db.transaction(|tx| require_user(tx, id)).unwrap()
    }

    fn setup() -> (Database, RoomView) {
        let db = Database::open_in_memory().unwrap();
        for id in ["ann", "bob"] {
            verified_user(&db, id, Some("NTU"));
        }
        let room = create_room(&db, &user(&db, "ann"), &RoomRequest { name: "Study".to_string(), school: None })
            .unwrap();
        (db, room)
    }

    #[test]
    fn test_create_assigns_owner_and_code() {
        let (db, room) = setup();
        assert_eq!(room.role, RoomRole::Owner);
        assert_eq!(room.school.as_deref(), Some("NTU"));
        assert_eq!(room.invite_code.as_ref().map(String::len), Some(8));

        let detail = room_detail(&db, &room.id, "ann").unwrap();
        assert_eq!(detail.members.len(), 1);
        assert_eq!(detail.members[0].role, RoomRole::Owner);
    }

    #[test]
    fn test_join_by_code_then_conflict() {
        let (db, room) = setup();
        let code = room.invite_code.unwrap().to_lowercase();

        let joined = join_room(&db, &user(&db, "bob"), &code).unwrap();
        assert_eq!(joined.value.role, RoomRole::Member);
        assert!(joined.value.invite_code.is_none());
        // no webhooks yet, so nothing to announce
        assert!(joined.notices.is_empty());

        assert!(matches!(
            join_room(&db, &user(&db, "bob"), &code).unwrap_err(),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            join_room(&db, &user(&db, "bob"), "NOPE0000").unwrap_err(),
            AppError::Validation(_)
        ));
        assert_eq!(room_detail(&db, &room.id, "bob").unwrap().members.len(), 2);
    }

    #[test]
    fn test_regenerated_code_replaces_old_one() {
        let (db, room) = setup();
        let old = room.invite_code.unwrap();
        let new = regenerate_invite_code(&db, &room.id, "ann").unwrap().invite_code;

        if old != new {
            assert!(join_room(&db, &user(&db, "bob"), &old).is_err());
        }
        join_room(&db, &user(&db, "bob"), &new).unwrap();
        assert!(matches!(invite_code(&db, &room.id, "bob").unwrap_err(), AppError::Forbidden(_)));
    }

    #[test]
    fn test_webhooks_are_owner_managed() {
        let (db, room) = setup();
        join_room(&db, &user(&db, "bob"), room.invite_code.as_deref().unwrap()).unwrap();

        assert!(matches!(
            add_webhook(&db, &room.id, "bob", "https://discord.com/api/webhooks/1/x").unwrap_err(),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            add_webhook(&db, &room.id, "ann", "ftp://example.com/hook").unwrap_err(),
            AppError::Validation(_)
        ));

        let hook = add_webhook(&db, &room.id, "ann", "https://discord.com/api/webhooks/1/x").unwrap();
        assert_eq!(webhooks(&db, &room.id, "bob").unwrap().len(), 1);

        // joins are announced once a webhook exists
        verified_user(&db, "cat", None);
        let joined = join_room(&db, &user(&db, "cat"), room.invite_code.as_deref().unwrap()).unwrap();
        assert_eq!(joined.notices.len(), 1);

        assert!(matches!(
            remove_webhook(&db, &room.id, &hook.id, "bob").unwrap_err(),
            AppError::Forbidden(_)
        ));
        remove_webhook(&db, &room.id, &hook.id, "ann").unwrap();
        assert!(matches!(
            remove_webhook(&db, &room.id, &hook.id, "ann").unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_owner_cannot_leave_and_members_can() {
        let (db, room) = setup();
        join_room(&db, &user(&db, "bob"), room.invite_code.as_deref().unwrap()).unwrap();

        assert!(matches!(leave_room(&db, &room.id, "ann").unwrap_err(), AppError::Forbidden(_)));
        leave_room(&db, &room.id, "bob").unwrap();
        assert!(matches!(room_detail(&db, &room.id, "bob").unwrap_err(), AppError::Forbidden(_)));
    }

    #[test]
    fn test_invite_email_is_owner_only() {
        let (db, room) = setup();
        let sent = invite_by_email(&db, &room.id, &user(&db, "ann"), "friend@campus.edu").unwrap();
        assert_eq!(sent.notices.len(), 1);

        join_room(&db, &user(&db, "bob"), room.invite_code.as_deref().unwrap()).unwrap();
        assert!(invite_by_email(&db, &room.id, &user(&db, "bob"), "friend@campus.edu").is_err());
    }

    #[test]
    fn test_members_free_slots() {
        let (db, room) = setup();
        join_room(&db, &user(&db, "bob"), room.invite_code.as_deref().unwrap()).unwrap();

        let mut tt = WeeklyTimetable::new();
        tt.set_day(
            "friday",
            vec![CourseSlot { period: "1".to_string(), course: "Art".to_string(), ..Default::default() }],
        )
        .unwrap();
        save_user_timetable(&db, "bob", &tt).unwrap();

        let free = members_free_slots(&db, &room.id, "ann", "friday", None, &default_periods()).unwrap();
        assert_eq!(free.members.len(), 2);
        assert_eq!(free.members[0].slots.len(), 8);
        assert_eq!(free.members[1].slots.len(), 7);
    }

    #[test]
    fn test_delete_room_is_owner_only() {
        let (db, room) = setup();
        join_room(&db, &user(&db, "bob"), room.invite_code.as_deref().unwrap()).unwrap();
        assert!(matches!(remove_room(&db, &room.id, "bob").unwrap_err(), AppError::Forbidden(_)));
        remove_room(&db, &room.id, "ann").unwrap();
        assert!(my_rooms(&db, "bob").unwrap().is_empty());
    }
}
