use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(id: Uuid, username: String, expiry_hours: u64) -> Result<Self, AuthError> {
        let now = Utc::now();
        let exp = i64::try_from(expiry_hours)
            .ok()
            .and_then(Duration::try_hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or(AuthError::InvalidExpiry(expiry_hours))?
            .timestamp();

        Ok(Self {
            id,
            username,
            exp,
            iat: now.timestamp(),
        })
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("token lifetime of {0} hours is out of range")]
    InvalidExpiry(u64),

    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("password worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, AuthError> {
    let secret = &security.jwt_secret;

    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Verifies signature and expiry. The error string is for logs only.
pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, String> {
    let secret = &security.jwt_secret;

    if secret.is_empty() {
        return Err("JWT secret not configured".to_string());
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("Invalid JWT token: {}", e))?;

    Ok(token_data.claims)
}

/// One-way salted hash for storage. Runs on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AuthError> {
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??)
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: String, hash: String) -> bool {
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
        Ok(verified) => verified.unwrap_or(false),
        Err(e) => {
            tracing::error!("Password verification task failed: {}", e);
            false
        }
    }
}
