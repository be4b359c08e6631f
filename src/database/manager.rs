use std::time::Duration;

use mongodb::{
    bson::{doc, Document},
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions},
    Client, Database, IndexModel,
};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::models::{Comment, Like, Playlist, Subscription, Tweet, User, Video};
use crate::database::repository::Repository;

const DUPLICATE_KEY: i32 = 11000;

/// Errors from the database layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("BSON conversion error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

impl From<mongodb::bson::ser::Error> for DatabaseError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        DatabaseError::Serialization(err.to_string())
    }
}

impl From<mongodb::bson::de::Error> for DatabaseError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        DatabaseError::Serialization(err.to_string())
    }
}

/// True when a write was rejected by a unique index
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Owns the client and hands out typed repositories for each collection.
///
/// Cloning is cheap: the driver handle is reference counted.
#[derive(Clone, Debug)]
pub struct DatabaseManager {
    db: Database,
}

impl DatabaseManager {
    pub const USERS: &'static str = "users";
    pub const VIDEOS: &'static str = "videos";
    pub const COMMENTS: &'static str = "comments";
    pub const LIKES: &'static str = "likes";
    pub const TWEETS: &'static str = "tweets";
    pub const PLAYLISTS: &'static str = "playlists";
    pub const SUBSCRIPTIONS: &'static str = "subscriptions";

    /// Build a client from configuration. The driver connects lazily, so this
    /// succeeds without a reachable server.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.app_name = Some("videotube-api".to_string());
        options.connect_timeout = Some(Duration::from_secs(config.connect_timeout_secs));
        options.server_selection_timeout = Some(Duration::from_secs(config.connect_timeout_secs));

        let client = Client::with_options(options)?;
        let db = client.database(&config.name);

        info!("Configured MongoDB client for database: {}", config.name);
        Ok(Self { db })
    }

    pub fn users(&self) -> Repository<User> {
        Repository::new(self.db.collection(Self::USERS))
    }

    pub fn videos(&self) -> Repository<Video> {
        Repository::new(self.db.collection(Self::VIDEOS))
    }

    pub fn comments(&self) -> Repository<Comment> {
        Repository::new(self.db.collection(Self::COMMENTS))
    }

    pub fn likes(&self) -> Repository<Like> {
        Repository::new(self.db.collection(Self::LIKES))
    }

    pub fn tweets(&self) -> Repository<Tweet> {
        Repository::new(self.db.collection(Self::TWEETS))
    }

    pub fn playlists(&self) -> Repository<Playlist> {
        Repository::new(self.db.collection(Self::PLAYLISTS))
    }

    pub fn subscriptions(&self) -> Repository<Subscription> {
        Repository::new(self.db.collection(Self::SUBSCRIPTIONS))
    }

    /// Pings the server to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    /// Create the indexes the service relies on for uniqueness and lookups.
    /// Index creation is idempotent, so this runs on every start.
    pub async fn ensure_indexes(&self) -> Result<(), DatabaseError> {
        for (collection, indexes) in index_plan() {
            let count = indexes.len();
            self.db
                .collection::<Document>(collection)
                .create_indexes(indexes)
                .await?;
            info!("Ensured {} index(es) on {}", count, collection);
        }
        Ok(())
    }
}

fn unique(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

/// Unique only among documents where `field` is set: likes carry exactly one
/// target, so each target kind gets its own partial index.
fn unique_when_present(keys: Document, field: &str) -> IndexModel {
    let mut present = Document::new();
    present.insert(field, doc! { "$exists": true });
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(present)
                .build(),
        )
        .build()
}

fn plain(keys: Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_plan() -> Vec<(&'static str, Vec<IndexModel>)> {
    vec![
        (
            DatabaseManager::USERS,
            vec![unique(doc! { "username": 1 }), unique(doc! { "email": 1 })],
        ),
        (
            DatabaseManager::VIDEOS,
            vec![
                IndexModel::builder()
                    .keys(doc! { "title": "text", "description": "text" })
                    .build(),
                unique(doc! { "owner": 1, "title": 1 }),
                plain(doc! { "isPublished": 1, "createdAt": -1 }),
            ],
        ),
        (
            DatabaseManager::COMMENTS,
            vec![plain(doc! { "video": 1, "createdAt": -1 })],
        ),
        (
            DatabaseManager::LIKES,
            vec![
                unique_when_present(doc! { "video": 1, "likedBy": 1 }, "video"),
                unique_when_present(doc! { "comment": 1, "likedBy": 1 }, "comment"),
                unique_when_present(doc! { "tweet": 1, "likedBy": 1 }, "tweet"),
                plain(doc! { "likedBy": 1, "createdAt": -1 }),
            ],
        ),
        (
            DatabaseManager::TWEETS,
            vec![unique(doc! { "owner": 1, "content": 1 })],
        ),
        (
            DatabaseManager::PLAYLISTS,
            vec![unique(doc! { "owner": 1, "name": 1 })],
        ),
        (
            DatabaseManager::SUBSCRIPTIONS,
            vec![
                unique(doc! { "channel": 1, "subscriber": 1 }),
                plain(doc! { "subscriber": 1, "createdAt": -1 }),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_rows_have_unique_pair_indexes() {
        let plan = index_plan();
        let subs = plan
            .iter()
            .find(|(name, _)| *name == DatabaseManager::SUBSCRIPTIONS)
            .unwrap();
        let pair = &subs.1[0];
        assert_eq!(pair.keys, doc! { "channel": 1, "subscriber": 1 });
        assert_eq!(pair.options.as_ref().and_then(|o| o.unique), Some(true));

        let likes = plan.iter().find(|(name, _)| *name == DatabaseManager::LIKES).unwrap();
        let unique_count = likes
            .1
            .iter()
            .filter(|m| m.options.as_ref().and_then(|o| o.unique) == Some(true))
            .count();
        assert_eq!(unique_count, 3);
    }

    #[tokio::test]
    async fn connect_is_lazy() {
        let config = crate::config::AppConfig::development().database;
        let manager = DatabaseManager::connect(&config).await;
        assert!(manager.is_ok());
    }
}
