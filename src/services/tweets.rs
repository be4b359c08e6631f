use mongodb::bson::{doc, oid::ObjectId, Document};

use crate::database::models::Tweet;
use crate::database::pipeline::{contains, size_of, Lookup, Pipeline, Projection};
use crate::database::{DatabaseManager, Page, Pagination, Sort};

use super::{ensure_owner, owner_lookup, ServiceError, ServiceResult};

const DUPLICATE_TWEET: &str = "The tweet already exists";

pub struct TweetService {
    db: DatabaseManager,
}

impl TweetService {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    pub async fn create(&self, owner: ObjectId, content: &str) -> ServiceResult<Tweet> {
        Ok(self
            .db
            .tweets()
            .insert(Tweet::new(owner, content), DUPLICATE_TWEET)
            .await?)
    }

    pub async fn update(&self, tweet_id: ObjectId, actor: ObjectId, content: &str) -> ServiceResult<Tweet> {
        self.owned(tweet_id, actor).await?;
        self.db
            .tweets()
            .update_by_id(tweet_id, doc! { "$set": { "content": content.trim() } }, DUPLICATE_TWEET)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tweet not found"))
    }

    /// Delete a tweet and the likes on it
    pub async fn delete(&self, tweet_id: ObjectId, actor: ObjectId) -> ServiceResult<()> {
        self.owned(tweet_id, actor).await?;
        self.db
            .tweets()
            .delete_one(doc! { "_id": tweet_id, "owner": actor })
            .await?
            .ok_or_else(|| ServiceError::not_found("Tweet not found"))?;
        self.db.likes().delete_many(doc! { "tweet": tweet_id }).await?;
        Ok(())
    }

    pub async fn by_user(
        &self,
        user_id: ObjectId,
        viewer: ObjectId,
        page: &Page,
    ) -> ServiceResult<(Vec<Document>, Pagination)> {
        if !self.db.users().exists(doc! { "_id": user_id }).await? {
            return Err(ServiceError::not_found("User not found"));
        }
        let total = self.db.tweets().count(doc! { "owner": user_id }).await?;
        let tweets = self
            .db
            .tweets()
            .aggregate(user_tweets_pipeline(user_id, viewer, page))
            .await?;
        Ok((tweets, Pagination::new(total, page)))
    }

    async fn owned(&self, tweet_id: ObjectId, actor: ObjectId) -> ServiceResult<Tweet> {
        let tweet = self
            .db
            .tweets()
            .find_by_id(tweet_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tweet not found"))?;
        ensure_owner(tweet.owner, actor, "tweet")?;
        Ok(tweet)
    }
}

pub fn user_tweets_pipeline(user_id: ObjectId, viewer: ObjectId, page: &Page) -> Pipeline {
    Pipeline::new()
        .match_on(doc! { "owner": user_id })
        .sort(&Sort::newest())
        .paginate(page)
        .lookup(owner_lookup("owner", "ownerDetails"))
        .unwind("ownerDetails")
        .lookup(Lookup::new(DatabaseManager::LIKES, "_id", "tweet", "likes"))
        .add_fields(doc! {
            "likesCount": size_of("likes"),
            "isLiked": contains(viewer, "likes.likedBy"),
        })
        .project(Projection::include(&[
            "content",
            "ownerDetails",
            "likesCount",
            "isLiked",
            "createdAt",
            "updatedAt",
        ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tweets_are_matched_by_owner_and_liked_by_tweet() {
        let user = ObjectId::new();
        let stages = user_tweets_pipeline(user, user, &Page { page: 3, limit: 4 }).into_stages();

        assert_eq!(stages[0], doc! { "$match": { "owner": user } });
        assert_eq!(stages[2], doc! { "$skip": 8_i64 });
        assert_eq!(stages[3], doc! { "$limit": 4_i64 });

        let likes = stages[6].get_document("$lookup").unwrap();
        assert_eq!(likes.get_str("from").unwrap(), "likes");
        assert_eq!(likes.get_str("foreignField").unwrap(), "tweet");
    }
}
