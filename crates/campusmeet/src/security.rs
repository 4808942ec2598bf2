//! Tokens, one-time codes and invite codes.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("static regex")
});

/// Characters of the URL-safe base64 alphabet, before uppercasing.
const URL_SAFE_EXTRA: [char; 2] = ['-', '_'];

pub const INVITE_CODE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

pub fn create_access_token(config: &AppConfig, user_id: &str) -> AppResult<String> {
    create_token(config, user_id, TokenType::Access, config.access_token_ttl)
}

pub fn create_refresh_token(config: &AppConfig, user_id: &str) -> AppResult<String> {
    create_token(config, user_id, TokenType::Refresh, config.refresh_token_ttl)
}

fn create_token(config: &AppConfig, user_id: &str, token_type: TokenType, ttl: Duration) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
        token_type,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret_key.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
}

/// Decodes a token and checks it is of the `expected` type.
///
/// # Returns
/// The subject (user id).
pub fn decode_token(config: &AppConfig, token: &str, expected: TokenType) -> AppResult<String> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret_key.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;

    if data.claims.token_type != expected {
        return Err(AppError::Unauthorized("Invalid token type".to_string()));
    }
    Ok(data.claims.sub)
}

/// Six random decimal digits.
pub fn generate_otp() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:06}")
}

/// Six uppercase hex characters.
pub fn generate_verification_code() -> String {
    let bytes: [u8; 3] = rand::thread_rng().gen();
    hex::encode(&bytes).to_uppercase()
}

/// Eight characters from the URL-safe alphabet, uppercased.
pub fn generate_invite_code() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITE_CODE_LEN)
        .map(|_| {
            // 62 alphanumerics plus '-' and '_'
            let i = rng.gen_range(0..64);
            if i < 62 {
                char::from(rng.sample(Alphanumeric))
            } else {
                URL_SAFE_EXTRA[i - 62]
            }
        })
        .collect::<String>()
        .to_uppercase()
}

/// Digest stored in place of a one-time code.
pub fn hash_code(email: &str, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(b":");
    hasher.update(code.trim().as_bytes());
    hex::encode(&hasher.finalize())
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Lowercase hex without pulling in another crate.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
