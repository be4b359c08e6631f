use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub videos: Vec<ObjectId>,
    pub owner: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Playlist {
    pub fn new(owner: ObjectId, name: &str, description: &str, videos: Vec<ObjectId>) -> Self {
        let now = DateTime::now();
        let mut unique_videos: Vec<ObjectId> = Vec::with_capacity(videos.len());
        for id in videos {
            if !unique_videos.contains(&id) {
                unique_videos.push(id);
            }
        }
        Self {
            id: None,
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            videos: unique_videos,
            owner,
            created_at: now,
            updated_at: now,
        }
    }
}
