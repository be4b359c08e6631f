use mongodb::bson::{doc, oid::ObjectId, Document};

use crate::database::models::Subscription;
use crate::database::paging::newest_first;
use crate::database::pipeline::{Pipeline, Projection};
use crate::database::{DatabaseManager, Page, Pagination, Toggle};

use super::{owner_lookup, ServiceError, ServiceResult};

pub struct SubscriptionService {
    db: DatabaseManager,
}

impl SubscriptionService {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    pub async fn toggle(&self, channel: ObjectId, subscriber: ObjectId) -> ServiceResult<Toggle<Subscription>> {
        if channel == subscriber {
            return Err(ServiceError::BadRequest(
                "You cannot subscribe to your own channel".to_string(),
            ));
        }
        self.require_user(channel, "Channel not found").await?;

        let outcome = self
            .db
            .subscriptions()
            .toggle(Subscription::key(channel, subscriber), || {
                Subscription::new(channel, subscriber)
            })
            .await?;
        tracing::debug!("Subscription {} -> {}: on = {}", subscriber, channel, outcome.is_on());
        Ok(outcome)
    }

    /// Users subscribed to `channel`; a channel nobody follows yields an empty page
    pub async fn subscribers(&self, channel: ObjectId, page: &Page) -> ServiceResult<(Vec<Document>, Pagination)> {
        self.require_user(channel, "Channel not found").await?;
        let total = self.db.subscriptions().count(doc! { "channel": channel }).await?;
        let rows = self
            .db
            .subscriptions()
            .aggregate(subscribers_pipeline(channel, page))
            .await?;
        Ok((rows, Pagination::new(total, page)))
    }

    pub async fn subscribed_channels(
        &self,
        subscriber: ObjectId,
        page: &Page,
    ) -> ServiceResult<(Vec<Document>, Pagination)> {
        self.require_user(subscriber, "User not found").await?;
        let total = self
            .db
            .subscriptions()
            .count(doc! { "subscriber": subscriber })
            .await?;
        let rows = self
            .db
            .subscriptions()
            .aggregate(subscribed_channels_pipeline(subscriber, page))
            .await?;
        Ok((rows, Pagination::new(total, page)))
    }

    async fn require_user(&self, id: ObjectId, message: &str) -> ServiceResult<()> {
        if !self.db.users().exists(doc! { "_id": id }).await? {
            return Err(ServiceError::not_found(message));
        }
        Ok(())
    }
}

pub fn subscribers_pipeline(channel: ObjectId, page: &Page) -> Pipeline {
    Pipeline::new()
        .match_on(doc! { "channel": channel })
        .sort_by(newest_first())
        .paginate(page)
        .lookup(owner_lookup("subscriber", "subscriber"))
        .first("subscriber")
        .project(Projection::include(&["subscriber", "createdAt"]).without_id())
}

pub fn subscribed_channels_pipeline(subscriber: ObjectId, page: &Page) -> Pipeline {
    Pipeline::new()
        .match_on(doc! { "subscriber": subscriber })
        .sort_by(newest_first())
        .paginate(page)
        .lookup(owner_lookup("channel", "channel"))
        .first("channel")
        .project(Projection::include(&["channel", "createdAt"]).without_id())
}
