use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    /// Seconds, as reported by the media host
    pub duration: f64,
    #[serde(default)]
    pub views: i64,
    #[serde(default = "published_by_default")]
    pub is_published: bool,
    pub owner: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

fn published_by_default() -> bool {
    true
}

impl Video {
    pub fn new(
        owner: ObjectId,
        title: &str,
        description: &str,
        video_file: &str,
        thumbnail: &str,
        duration: f64,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            video_file: video_file.to_string(),
            thumbnail: thumbnail.to_string(),
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            duration,
            views: 0,
            is_published: true,
            owner,
            created_at: now,
            updated_at: now,
        }
    }
}
