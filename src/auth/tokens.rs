use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use crate::config::SecurityConfig;
use crate::database::models::User;

/// Claims carried by the short-lived access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub email: String,
    pub username: String,
    pub fullname: String,
    pub exp: i64,
    pub iat: i64,
}

/// Claims carried by the long-lived refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    #[serde(rename = "_id")]
    pub user_id: String,
    /// Unique per issuance so two tokens minted in the same second never collide
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issue a fresh access + refresh token pair for a user
pub fn issue_token_pair(user: &User, security: &SecurityConfig) -> Result<TokenPair, AuthError> {
    let user_id = user
        .id
        .ok_or_else(|| AuthError::TokenGeneration("user has no id".to_string()))?
        .to_hex();
    let now = Utc::now();

    let access = AccessClaims {
        user_id: user_id.clone(),
        email: user.email.clone(),
        username: user.username.clone(),
        fullname: user.fullname.clone(),
        exp: (now + Duration::seconds(security.access_token_expiry_secs)).timestamp(),
        iat: now.timestamp(),
    };

    let refresh = RefreshClaims {
        user_id,
        jti: Uuid::new_v4().to_string(),
        exp: (now + Duration::seconds(security.refresh_token_expiry_secs)).timestamp(),
        iat: now.timestamp(),
    };

    Ok(TokenPair {
        access_token: sign(&access, &security.access_token_secret)?,
        refresh_token: sign(&refresh, &security.refresh_token_secret)?,
    })
}

pub fn verify_access_token(token: &str, security: &SecurityConfig) -> Result<AccessClaims, AuthError> {
    verify(token, &security.access_token_secret)
}

pub fn verify_refresh_token(token: &str, security: &SecurityConfig) -> Result<RefreshClaims, AuthError> {
    verify(token, &security.refresh_token_secret)
}

fn sign<C: Serialize>(claims: &C, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::TokenGeneration("signing secret not configured".to_string()));
    }

    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

fn verify<C: DeserializeOwned>(token: &str, secret: &str) -> Result<C, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidToken("Token secret not configured".to_string()));
    }

    let mut validation = Validation::default();
    validation.leeway = 0;

    decode::<C>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(format!("Invalid token: {}", e)))
}
