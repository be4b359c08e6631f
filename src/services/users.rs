use std::cmp::Reverse;

use mongodb::bson::{doc, oid::ObjectId, Bson, Document};

use crate::auth::{self, TokenPair};
use crate::config::SecurityConfig;
use crate::database::models::User;
use crate::database::pipeline::{contains, size_of, Lookup, Pipeline, Projection};
use crate::database::DatabaseManager;

use super::videos::visible_to;
use super::{owner_lookup, ServiceError, ServiceResult};

const DUPLICATE_USER: &str = "User with email or username already exists";

/// Fields accepted on registration, after the avatar has been uploaded
#[derive(Debug, Clone)]
pub struct Registration {
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub avatar_url: String,
    pub cover_image_url: String,
}

/// Account operations: credentials, sessions, profile and history
pub struct UserService {
    db: DatabaseManager,
}

impl UserService {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    /// Fail early, before any upload, when the username or email is taken
    pub async fn ensure_available(&self, username: &str, email: &str) -> ServiceResult<()> {
        let taken = self
            .db
            .users()
            .exists(identity_filter(username, email))
            .await?;
        if taken {
            return Err(ServiceError::Conflict(DUPLICATE_USER.to_string()));
        }
        Ok(())
    }

    pub async fn register(&self, registration: Registration) -> ServiceResult<User> {
        self.ensure_available(&registration.username, &registration.email).await?;

        let hash = auth::hash_password(&registration.password)?;
        let user = User::new(
            &registration.fullname,
            &registration.username,
            &registration.email,
            &hash,
            &registration.avatar_url,
            &registration.cover_image_url,
        );

        let user = self.db.users().insert(user, DUPLICATE_USER).await?;
        tracing::info!("Registered user {}", user.username);
        Ok(user)
    }

    /// Check credentials and start a session. `identifier` is a username or
    /// an email address.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        security: &SecurityConfig,
    ) -> ServiceResult<(User, TokenPair)> {
        let user = self
            .db
            .users()
            .find_one(identity_filter(identifier, identifier))
            .await?
            .ok_or_else(|| ServiceError::not_found("User does not exist"))?;

        if !auth::verify_password(password, &user.password) {
            tracing::warn!("Failed login for {}", user.username);
            return Err(ServiceError::Unauthorized("The password is invalid".to_string()));
        }

        self.start_session(user, security).await
    }

    async fn start_session(&self, user: User, security: &SecurityConfig) -> ServiceResult<(User, TokenPair)> {
        let user_id = user.id.ok_or_else(|| ServiceError::not_found("User does not exist"))?;
        let pair = auth::issue_token_pair(&user, security)?;
        let user = self
            .db
            .users()
            .update_by_id(
                user_id,
                doc! { "$set": { "refreshToken": pair.refresh_token.clone() } },
                DUPLICATE_USER,
            )
            .await?
            .ok_or_else(|| ServiceError::not_found("User does not exist"))?;

        tracing::info!("Started session for {}", user.username);
        Ok((user, pair))
    }

    /// Exchange a refresh token for a new pair. The stored token is swapped
    /// with a conditional update, so a token can be redeemed only once.
    pub async fn refresh(&self, presented: &str, security: &SecurityConfig) -> ServiceResult<(User, TokenPair)> {
        let claims = auth::verify_refresh_token(presented, security).map_err(|e| {
            tracing::warn!("Rejected refresh token: {}", e);
            ServiceError::Unauthorized("Invalid refresh token".to_string())
        })?;
        let user_id = ObjectId::parse_str(&claims.user_id)
            .map_err(|_| ServiceError::Unauthorized("Invalid refresh token".to_string()))?;

        let user = self
            .db
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid refresh token".to_string()))?;

        if user.refresh_token.as_deref() != Some(presented) {
            tracing::warn!("Stale refresh token presented for {}", user.username);
            return Err(ServiceError::Unauthorized("Refresh token is expired or used".to_string()));
        }

        let pair = auth::issue_token_pair(&user, security)?;
        let rotated = self
            .db
            .users()
            .update_one(
                doc! { "_id": user_id, "refreshToken": presented },
                doc! { "$set": { "refreshToken": pair.refresh_token.clone() } },
                DUPLICATE_USER,
            )
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Refresh token is expired or used".to_string()))?;

        Ok((rotated, pair))
    }

    pub async fn logout(&self, user_id: ObjectId) -> ServiceResult<()> {
        self.db
            .users()
            .update_by_id(user_id, doc! { "$unset": { "refreshToken": 1 } }, DUPLICATE_USER)
            .await?;
        Ok(())
    }

    pub async fn change_password(
        &self,
        user: &User,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> ServiceResult<()> {
        if new_password != confirm_password {
            return Err(ServiceError::BadRequest(
                "New password and confirm password do not match".to_string(),
            ));
        }
        if !auth::verify_password(old_password, &user.password) {
            return Err(ServiceError::Unauthorized("Invalid password".to_string()));
        }

        let user_id = user.id.ok_or_else(|| ServiceError::not_found("User does not exist"))?;
        let hash = auth::hash_password(new_password)?;
        self.db
            .users()
            .update_by_id(user_id, doc! { "$set": { "password": hash } }, DUPLICATE_USER)
            .await?;
        Ok(())
    }

    pub async fn update_account(&self, user_id: ObjectId, fullname: &str, email: &str) -> ServiceResult<User> {
        self.db
            .users()
            .update_by_id(
                user_id,
                doc! { "$set": { "fullname": fullname.trim(), "email": email.trim().to_lowercase() } },
                "Email is already in use",
            )
            .await?
            .ok_or_else(|| ServiceError::not_found("User does not exist"))
    }

    /// Point `avatar` or `coverImage` at a freshly uploaded file
    pub async fn set_image(&self, user_id: ObjectId, field: ImageField, url: &str) -> ServiceResult<User> {
        let mut set = Document::new();
        set.insert(field.as_str(), url);
        self.db
            .users()
            .update_by_id(user_id, doc! { "$set": set }, DUPLICATE_USER)
            .await?
            .ok_or_else(|| ServiceError::not_found("User does not exist"))
    }

    pub async fn channel_profile(&self, username: &str, viewer: ObjectId) -> ServiceResult<Document> {
        self.db
            .users()
            .aggregate(channel_profile_pipeline(username, viewer))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found("Channel not found"))
    }

    /// Watched videos with their owners, most recently watched first
    pub async fn watch_history(&self, user_id: ObjectId) -> ServiceResult<Vec<Bson>> {
        let mut rows = self.db.users().aggregate(watch_history_pipeline(user_id)).await?;
        let Some(row) = rows.pop() else {
            return Err(ServiceError::not_found("User does not exist"));
        };

        let order = row.get_array("order").cloned().unwrap_or_default();
        let mut videos = row.get_array("watchHistory").cloned().unwrap_or_default();
        videos.sort_by_key(|v| {
            let id = v.as_document().and_then(|d| d.get("_id")).cloned();
            Reverse(order.iter().position(|o| Some(o) == id.as_ref()))
        });
        Ok(videos)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageField {
    Avatar,
    CoverImage,
}

impl ImageField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageField::Avatar => "avatar",
            ImageField::CoverImage => "coverImage",
        }
    }
}

fn identity_filter(username: &str, email: &str) -> Document {
    doc! {
        "$or": [
            { "username": username.trim().to_lowercase() },
            { "email": email.trim().to_lowercase() }
        ]
    }
}

pub fn channel_profile_pipeline(username: &str, viewer: ObjectId) -> Pipeline {
    Pipeline::new()
        .match_on(doc! { "username": username.trim().to_lowercase() })
        .lookup(Lookup::new(DatabaseManager::SUBSCRIPTIONS, "_id", "channel", "subscribers"))
        .lookup(Lookup::new(DatabaseManager::SUBSCRIPTIONS, "_id", "subscriber", "subscribedTo"))
        .add_fields(doc! {
            "subscribersCount": size_of("subscribers"),
            "channelsSubscribedToCount": size_of("subscribedTo"),
            "isSubscribed": contains(viewer, "subscribers.subscriber"),
        })
        .project(Projection::include(&[
            "fullname",
            "username",
            "email",
            "avatar",
            "coverImage",
            "subscribersCount",
            "channelsSubscribedToCount",
            "isSubscribed",
            "createdAt",
        ]))
}

/// The `$lookup` on an id array does not keep array order, so the raw id list
/// is carried along as `order` for re-sorting.
pub fn watch_history_pipeline(user_id: ObjectId) -> Pipeline {
    let videos = Pipeline::new()
        .match_on(visible_to(user_id))
        .lookup(owner_lookup("owner", "owner"))
        .first("owner");

    Pipeline::new()
        .match_on(doc! { "_id": user_id })
        .add_fields(doc! { "order": "$watchHistory" })
        .lookup(Lookup::new(DatabaseManager::VIDEOS, "watchHistory", "_id", "watchHistory").with_pipeline(videos))
        .project(Projection::include(&["watchHistory", "order"]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_matches_username_or_email_lowercased() {
        assert_eq!(
            identity_filter(" Alice ", "ALICE@X.IO"),
            doc! { "$or": [{ "username": "alice" }, { "email": "alice@x.io" }] }
        );
    }

    #[test]
    fn channel_profile_joins_both_directions() {
        let viewer = ObjectId::new();
        let stages = channel_profile_pipeline("Bob", viewer).into_stages();
        assert_eq!(stages[0], doc! { "$match": { "username": "bob" } });

        let subscribers = stages[1].get_document("$lookup").unwrap();
        assert_eq!(subscribers.get_str("localField").unwrap(), "_id");
        assert_eq!(subscribers.get_str("foreignField").unwrap(), "channel");
        assert_eq!(subscribers.get_str("as").unwrap(), "subscribers");

        let subscribed = stages[2].get_document("$lookup").unwrap();
        assert_eq!(subscribed.get_str("foreignField").unwrap(), "subscriber");
        assert_eq!(subscribed.get_str("as").unwrap(), "subscribedTo");

        let fields = stages[3].get_document("$addFields").unwrap();
        assert_eq!(fields.get("subscribersCount"), Some(&size_of("subscribers")));
        assert_eq!(fields.get("isSubscribed"), Some(&contains(viewer, "subscribers.subscriber")));

        let projection = stages[4].get_document("$project").unwrap();
        assert!(!projection.contains_key("password"));
        assert!(!projection.contains_key("subscribers"));
        assert_eq!(projection.get_i32("isSubscribed").unwrap(), 1);
    }

    #[test]
    fn watch_history_embeds_owner_join() {
        let user = ObjectId::new();
        let stages = watch_history_pipeline(user).into_stages();
        let lookup = stages[2].get_document("$lookup").unwrap();
        assert_eq!(lookup.get_str("from").unwrap(), "videos");
        assert_eq!(lookup.get_str("localField").unwrap(), "watchHistory");
        assert_eq!(lookup.get_str("foreignField").unwrap(), "_id");

        let nested = lookup.get_array("pipeline").unwrap();
        assert_eq!(nested.len(), 3);
        assert_eq!(
            nested[0].as_document().unwrap(),
            &doc! { "$match": { "$or": [{ "isPublished": true }, { "owner": user }] } }
        );
        assert_eq!(
            nested[2].as_document().unwrap(),
            &doc! { "$addFields": { "owner": { "$first": "$owner" } } }
        );
    }
}
