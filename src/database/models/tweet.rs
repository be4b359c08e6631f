use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub content: String,
    pub owner: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Tweet {
    pub fn new(owner: ObjectId, content: &str) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            content: content.trim().to_string(),
            owner,
            created_at: now,
            updated_at: now,
        }
    }
}
