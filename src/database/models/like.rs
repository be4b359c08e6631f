use mongodb::bson::{oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};

/// What a like points at. A like row always has exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Video(ObjectId),
    Comment(ObjectId),
    Tweet(ObjectId),
}

impl LikeTarget {
    /// Name of the reference field on the like row
    pub fn field(&self) -> &'static str {
        match self {
            LikeTarget::Video(_) => "video",
            LikeTarget::Comment(_) => "comment",
            LikeTarget::Tweet(_) => "tweet",
        }
    }

    pub fn id(&self) -> ObjectId {
        match self {
            LikeTarget::Video(id) | LikeTarget::Comment(id) | LikeTarget::Tweet(id) => *id,
        }
    }

    /// Capitalised noun used in response messages
    pub fn label(&self) -> &'static str {
        match self {
            LikeTarget::Video(_) => "Video",
            LikeTarget::Comment(_) => "Comment",
            LikeTarget::Tweet(_) => "Tweet",
        }
    }

    /// Filter matching the single like row of `liked_by` on this target
    pub fn key(&self, liked_by: ObjectId) -> Document {
        let mut key = Document::new();
        key.insert(self.field(), self.id());
        key.insert("likedBy", liked_by);
        key
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweet: Option<ObjectId>,
    pub liked_by: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Like {
    pub fn new(target: LikeTarget, liked_by: ObjectId) -> Self {
        let now = DateTime::now();
        let mut like = Self {
            id: None,
            video: None,
            comment: None,
            tweet: None,
            liked_by,
            created_at: now,
            updated_at: now,
        };
        match target {
            LikeTarget::Video(id) => like.video = Some(id),
            LikeTarget::Comment(id) => like.comment = Some(id),
            LikeTarget::Tweet(id) => like.tweet = Some(id),
        }
        like
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{self, doc};

    #[test]
    fn new_like_has_exactly_one_target() {
        let user = ObjectId::new();
        let tweet = ObjectId::new();
        let like = Like::new(LikeTarget::Tweet(tweet), user);

        let stored = bson::to_document(&like).unwrap();
        assert_eq!(stored.get_object_id("tweet").unwrap(), tweet);
        assert!(!stored.contains_key("video"));
        assert!(!stored.contains_key("comment"));
        assert_eq!(stored.get_object_id("likedBy").unwrap(), user);
    }

    #[test]
    fn key_filters_on_target_field_and_actor() {
        let user = ObjectId::new();
        let video = ObjectId::new();
        assert_eq!(
            LikeTarget::Video(video).key(user),
            doc! { "video": video, "likedBy": user }
        );
    }
}
