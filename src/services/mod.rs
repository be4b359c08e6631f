pub mod comments;
pub mod likes;
pub mod media;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

pub use comments::CommentService;
pub use likes::LikeService;
pub use media::{build_media_store, MediaError, MediaStore, StagedFile, UploadedMedia};
pub use playlists::PlaylistService;
pub use subscriptions::SubscriptionService;
pub use tweets::TweetService;
pub use users::UserService;
pub use videos::VideoService;

use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use crate::auth::AuthError;
use crate::database::pipeline::{Lookup, Pipeline, Projection};
use crate::database::DatabaseError;

/// Business-rule failures raised by the entity services
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }
}

/// Only the owner may change or delete a resource
pub fn ensure_owner(owner: ObjectId, actor: ObjectId, what: &str) -> ServiceResult<()> {
    if owner == actor {
        Ok(())
    } else {
        tracing::warn!("User {} tried to modify {} owned by {}", actor, what, owner);
        Err(ServiceError::Forbidden(format!("You are not allowed to modify this {}", what)))
    }
}

/// Public fields of a user embedded in other documents
pub const OWNER_FIELDS: &[&str] = &["fullname", "username", "avatar"];

/// Join the user referenced by `local_field`, keeping only [`OWNER_FIELDS`]
pub fn owner_lookup(local_field: &str, as_field: &str) -> Lookup {
    Lookup::new(crate::database::DatabaseManager::USERS, local_field, "_id", as_field)
        .with_pipeline(Pipeline::new().project(Projection::include(OWNER_FIELDS)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn owner_check() {
        let a = ObjectId::new();
        assert!(ensure_owner(a, a, "video").is_ok());
        let err = ensure_owner(a, ObjectId::new(), "video").unwrap_err();
        assert_eq!(err.to_string(), "You are not allowed to modify this video");
    }

    #[test]
    fn owner_lookup_projects_public_fields_only() {
        let stage = Pipeline::new()
            .lookup(owner_lookup("owner", "owner"))
            .into_stages()
            .remove(0);
        let lookup = stage.get_document("$lookup").unwrap();
        assert_eq!(lookup.get_str("from").unwrap(), "users");
        assert_eq!(lookup.get_str("localField").unwrap(), "owner");
        assert_eq!(lookup.get_str("foreignField").unwrap(), "_id");
        let nested = lookup.get_array("pipeline").unwrap();
        assert_eq!(
            nested[0].as_document().unwrap(),
            &doc! { "$project": { "fullname": 1, "username": 1, "avatar": 1 } }
        );
    }
}
