use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Fields never returned to clients.
pub const PRIVATE_USER_FIELDS: &[&str] = &["password", "refreshToken"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    pub fullname: String,
    /// Media host URL
    pub avatar: String,
    #[serde(default)]
    pub cover_image: String,
    /// Argon2 PHC string
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub watch_history: Vec<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    /// Username and email are stored lowercased so lookups are case-insensitive.
    pub fn new(
        fullname: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        avatar: &str,
        cover_image: &str,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            username: username.trim().to_lowercase(),
            email: email.trim().to_lowercase(),
            fullname: fullname.trim().to_string(),
            avatar: avatar.to_string(),
            cover_image: cover_image.to_string(),
            password: password_hash.to_string(),
            refresh_token: None,
            watch_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
