//! Signup, email verification, OTP login and token refresh.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{code_ttl, optional_text, required_text, WithNotices};
use crate::config::AppConfig;
use crate::db::codes::{consume_code, insert_code, invalidate_unused};
use crate::db::types::{CodePurpose, DbUser};
use crate::db::users::{get_user, get_user_by_email, insert_user, set_email_verified, NewUser};
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::notify::{login_otp_email, verification_email, Notification};
use crate::security::{
    create_access_token, create_refresh_token, decode_token, generate_otp,
    generate_verification_code, hash_code, is_valid_email, TokenType,
};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub name: String,
    pub school: Option<String>,
    pub major: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    Ok(email)
}

/// Registers an unverified user and mails a verification code.
pub fn signup(db: &Database, req: &SignupRequest) -> AppResult<WithNotices<DbUser>> {
    let email = normalize_email(&req.email)?;
    let name = required_text(&req.name, "name")?;
    let school = optional_text(req.school.as_deref());
    let major = optional_text(req.major.as_deref());
    let code = generate_verification_code();
    let id = Uuid::new_v4().to_string();

    let user = db.transaction(|tx| {
        insert_user(
            tx,
            &NewUser {
                id: &id,
                email: &email,
                name: Some(&name),
                school: school.as_deref(),
                major: major.as_deref(),
            },
        )?;
        insert_code(
            tx,
            &email,
            CodePurpose::VerifyEmail,
            &hash_code(&email, &code),
            Utc::now() + code_ttl(),
        )?;
        get_user(tx, &id)?.ok_or_else(|| AppError::not_found("User"))
    })?;

    info!("Registered user {} ({})", user.id, user.email);
    Ok(WithNotices::new(user).notify(Some(Notification::Email(verification_email(&email, &code)))))
}

/// Consumes a verification code and marks the address verified.
pub fn verify_email(db: &Database, email: &str, code: &str) -> AppResult<()> {
    let email = email.trim().to_lowercase();
    let digest = hash_code(&email, &code.trim().to_uppercase());

    db.transaction(|tx| {
        if !consume_code(tx, &email, CodePurpose::VerifyEmail, &digest, Utc::now())? {
            return Err(AppError::Validation(
                "Invalid or expired verification code".to_string(),
            ));
        }
        set_email_verified(tx, &email)?;
        Ok(())
    })
}

/// Issues a fresh login code, voiding any unused earlier ones for the address.
pub fn request_login_otp(db: &Database, email: &str) -> AppResult<WithNotices<()>> {
    let email = email.trim().to_lowercase();
    let code = generate_otp();

    db.transaction(|tx| {
        let user = get_user_by_email(tx, &email)?.ok_or_else(|| AppError::not_found("User"))?;
        if !user.is_active {
            return Err(AppError::Validation("Account is disabled".to_string()));
        }
        if !user.email_verified {
            return Err(AppError::Validation("Email not verified".to_string()));
        }

        invalidate_unused(tx, &email, CodePurpose::Login)?;
        insert_code(
            tx,
            &email,
            CodePurpose::Login,
            &hash_code(&email, &code),
            Utc::now() + code_ttl(),
        )
    })?;

    Ok(WithNotices::new(()).notify(Some(Notification::Email(login_otp_email(&email, &code)))))
}

/// Exchanges a login code for an access/refresh token pair.
pub fn login(db: &Database, config: &AppConfig, email: &str, code: &str) -> AppResult<TokenPair> {
    let email = email.trim().to_lowercase();
    let digest = hash_code(&email, code);

    let user = db.transaction(|tx| {
        if !consume_code(tx, &email, CodePurpose::Login, &digest, Utc::now())? {
            return Err(AppError::Unauthorized("Invalid or expired code".to_string()));
        }
        get_user_by_email(tx, &email)?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired code".to_string()))
    })?;

    info!("User {} logged in", user.id);
    Ok(TokenPair {
        access_token: create_access_token(config, &user.id)?,
        refresh_token: create_refresh_token(config, &user.id)?,
        token_type: "bearer",
    })
}

/// Issues a new access token. The refresh token is handed back unchanged.
pub fn refresh(db: &Database, config: &AppConfig, refresh_token: &str) -> AppResult<TokenPair> {
    let user_id = decode_token(config, refresh_token, TokenType::Refresh)?;
    let user = authenticated_user(db, &user_id)?;
    Ok(TokenPair {
        access_token: create_access_token(config, &user.id)?,
        refresh_token: refresh_token.to_string(),
        token_type: "bearer",
    })
}

/// Resolves a bearer access token to an existing, active user.
pub fn authenticate(db: &Database, config: &AppConfig, access_token: &str) -> AppResult<DbUser> {
    let user_id = decode_token(config, access_token, TokenType::Access)?;
    authenticated_user(db, &user_id)
}

fn authenticated_user(db: &Database, user_id: &str) -> AppResult<DbUser> {
    db.transaction(|tx| get_user(tx, user_id))?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found or inactive".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup_req(email: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            name: "Ann".to_string(),
            school: Some("NTU".to_string()),
            major: None,
        }
    }

    fn mailed_code(notices: &[Notification]) -> String {
        match &notices[0] {
            Notification::Email(m) => m
                .body
                .split_whitespace()
                .find(|w| w.trim_end_matches('.').len() == 6)
                .map(|w| w.trim_end_matches('.').to_string())
                .unwrap(),
            other => panic!("expected email, got {other:?}"),
        }
    }

    #[test]
    fn test_full_login_flow() {
        let db = Database::open_in_memory().unwrap();
        let config = AppConfig::for_tests();

        let signed_up = signup(&db, &signup_req("Ann@Campus.edu")).unwrap();
        assert_eq!(signed_up.value.email, "ann@campus.edu");
        assert!(!signed_up.value.email_verified);

        // unverified users cannot ask for a login code
        assert!(matches!(
            request_login_otp(&db, "ann@campus.edu").unwrap_err(),
            AppError::Validation(_)
        ));

        let code = mailed_code(&signed_up.notices);
        verify_email(&db, "ann@campus.edu", &code).unwrap();

        let otp = mailed_code(&request_login_otp(&db, "ann@campus.edu").unwrap().notices);
        let tokens = login(&db, &config, "ann@campus.edu", &otp).unwrap();
        assert_eq!(tokens.token_type, "bearer");

        let user = authenticate(&db, &config, &tokens.access_token).unwrap();
        assert_eq!(user.id, signed_up.value.id);

        // the code is single use
        assert!(matches!(
            login(&db, &config, "ann@campus.edu", &otp).unwrap_err(),
            AppError::Unauthorized(_)
        ));
    }

    #[test]
    fn test_duplicate_signup_and_bad_email() {
        let db = Database::open_in_memory().unwrap();
        signup(&db, &signup_req("ann@campus.edu")).unwrap();
        assert!(matches!(
            signup(&db, &signup_req("ann@campus.edu")).unwrap_err(),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            signup(&db, &signup_req("not-an-email")).unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[test]
    fn test_wrong_verification_code() {
        let db = Database::open_in_memory().unwrap();
        signup(&db, &signup_req("ann@campus.edu")).unwrap();
        assert!(matches!(
            verify_email(&db, "ann@campus.edu", "ZZZZZZ").unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[test]
    fn test_new_otp_invalidates_previous() {
        let db = Database::open_in_memory().unwrap();
        let config = AppConfig::for_tests();
        let signed_up = signup(&db, &signup_req("ann@campus.edu")).unwrap();
        verify_email(&db, "ann@campus.edu", &mailed_code(&signed_up.notices)).unwrap();

        let first = mailed_code(&request_login_otp(&db, "ann@campus.edu").unwrap().notices);
        let second = mailed_code(&request_login_otp(&db, "ann@campus.edu").unwrap().notices);

        if first != second {
            assert!(login(&db, &config, "ann@campus.edu", &first).is_err());
        }
        assert!(login(&db, &config, "ann@campus.edu", &second).is_ok());
    }

    #[test]
    fn test_refresh_rejects_access_token() {
        let db = Database::open_in_memory().unwrap();
        let config = AppConfig::for_tests();
        let user = signup(&db, &signup_req("ann@campus.edu")).unwrap().value;

        let access = create_access_token(&config, &user.id).unwrap();
        assert!(matches!(
            refresh(&db, &config, &access).unwrap_err(),
            AppError::Unauthorized(_)
        ));

        let refresh_token = create_refresh_token(&config, &user.id).unwrap();
        let pair = refresh(&db, &config, &refresh_token).unwrap();
        assert_eq!(pair.refresh_token, refresh_token);
        assert!(authenticate(&db, &config, &refresh_token).is_err());
    }

    #[test]
    fn test_unknown_user_cannot_request_otp() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            request_login_otp(&db, "ghost@campus.edu").unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
