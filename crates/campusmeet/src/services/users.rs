//! Profile lookup and admin user management.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{optional_text, require_user};
use crate::db::types::DbUser;
use crate::db::users::{delete_user, list_users, update_user};
use crate::db::Database;
use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Serialize)]
pub struct UserPage {
    pub users: Vec<DbUser>,
    pub total: u64,
}

/// Fields an admin may change. Absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub school: Option<String>,
    pub major: Option<String>,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
}

pub fn get_profile(db: &Database, user_id: &str) -> AppResult<DbUser> {
    db.transaction(|tx| require_user(tx, user_id))
}

/// One page of users, newest first.
///
/// `limit` defaults to 50 and must lie in 1..=100.
pub fn list_page(db: &Database, skip: Option<u32>, limit: Option<u32>) -> AppResult<UserPage> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let (users, total) = db.transaction(|tx| list_users(tx, skip.unwrap_or(0), limit))?;
    Ok(UserPage { users, total })
}

/// Applies an admin edit. Admins cannot revoke their own admin flag.
pub fn admin_update(db: &Database, admin: &DbUser, user_id: &str, update: &UserUpdate) -> AppResult<DbUser> {
    if user_id == admin.id && update.is_admin == Some(false) {
        return Err(AppError::Forbidden(
            "Cannot remove your own admin privileges".to_string(),
        ));
    }

    db.transaction(|tx| {
        let mut user = require_user(tx, user_id)?;
        if let Some(name) = &update.name {
            user.name = optional_text(Some(name));
        }
        if let Some(school) = &update.school {
            user.school = optional_text(Some(school));
        }
        if let Some(major) = &update.major {
            user.major = optional_text(Some(major));
        }
        if let Some(active) = update.is_active {
            user.is_active = active;
        }
        if let Some(is_admin) = update.is_admin {
            user.is_admin = is_admin;
        }
        update_user(tx, &user)?;
        require_user(tx, user_id)
    })
}

pub fn admin_delete(db: &Database, admin: &DbUser, user_id: &str) -> AppResult<()> {
    if user_id == admin.id {
        return Err(AppError::Forbidden("Cannot delete yourself".to_string()));
    }

    db.transaction(|tx| {
        if !delete_user(tx, user_id)? {
            return Err(AppError::not_found("User"));
        }
        Ok(())
    })?;
    info!("Admin {} deleted user {}", admin.id, user_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::verified_user;

    fn admin(db: &Database) -> DbUser {
        verified_user(db, "root", None);
        let mut root = get_profile(db, "root").unwrap();
        root.is_admin = true;
        db.transaction(|tx| update_user(tx, &root)).unwrap();
        root
    }

    #[test]
    fn test_admin_cannot_demote_or_delete_self() {
        let db = Database::open_in_memory().unwrap();
        let root = admin(&db);

        let demote = UserUpdate { is_admin: Some(false), ..Default::default() };
        assert!(matches!(
            admin_update(&db, &root, "root", &demote).unwrap_err(),
            AppError::Forbidden(_)
        ));
        assert!(get_profile(&db, "root").unwrap().is_admin);

        assert!(matches!(admin_delete(&db, &root, "root").unwrap_err(), AppError::Forbidden(_)));
    }

    #[test]
    fn test_admin_edits_other_user() {
        let db = Database::open_in_memory().unwrap();
        let root = admin(&db);
        verified_user(&db, "bob", None);

        let update = UserUpdate {
            school: Some("NTHU".to_string()),
            is_active: Some(false),
            ..Default::default()
        };
        let bob = admin_update(&db, &root, "bob", &update).unwrap();
        assert_eq!(bob.school.as_deref(), Some("NTHU"));
        assert!(!bob.is_active);
        assert_eq!(bob.name.as_deref(), Some("bob"));

        admin_delete(&db, &root, "bob").unwrap();
        assert!(matches!(admin_delete(&db, &root, "bob").unwrap_err(), AppError::NotFound(_)));
    }

    #[test]
    fn test_page_limit_bounds() {
        let db = Database::open_in_memory().unwrap();
        admin(&db);
        assert!(list_page(&db, None, Some(0)).is_err());
        assert!(list_page(&db, None, Some(101)).is_err());

        let page = list_page(&db, None, None).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.users.len(), 1);
    }
}
