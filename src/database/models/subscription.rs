use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};

/// Directed follow edge: `subscriber` follows `channel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub channel: ObjectId,
    pub subscriber: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Subscription {
    pub fn new(channel: ObjectId, subscriber: ObjectId) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            channel,
            subscriber,
            created_at: now,
            updated_at: now,
        }
    }

    /// Filter matching the single row for this (channel, subscriber) pair
    pub fn key(channel: ObjectId, subscriber: ObjectId) -> Document {
        doc! { "channel": channel, "subscriber": subscriber }
    }
}
