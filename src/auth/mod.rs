//! Credential services: password hashing and signed session tokens.
//!
//! These are plain functions over explicit inputs; nothing here is attached to
//! the user model.

pub mod password;
pub mod tokens;

pub use password::{hash_password, verify_password};
pub use tokens::{issue_token_pair, verify_access_token, verify_refresh_token, AccessClaims, RefreshClaims, TokenPair};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidToken(String),

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Password hashing error: {0}")]
    Hashing(String),
}
