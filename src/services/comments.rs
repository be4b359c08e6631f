use mongodb::bson::{doc, oid::ObjectId, Document};

use crate::database::models::Comment;
use crate::database::pipeline::{contains, size_of, Lookup, Pipeline, Projection};
use crate::database::{DatabaseManager, Page, Pagination, Sort};

use super::{ensure_owner, owner_lookup, ServiceError, ServiceResult, VideoService};

pub struct CommentService {
    db: DatabaseManager,
}

impl CommentService {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    pub async fn add(&self, video_id: ObjectId, owner: ObjectId, content: &str) -> ServiceResult<Comment> {
        VideoService::new(self.db.clone()).require_visible(video_id, owner).await?;
        let comment = self
            .db
            .comments()
            .insert(Comment::new(video_id, owner, content), "Comment already exists")
            .await?;
        Ok(comment)
    }

    pub async fn list(
        &self,
        video_id: ObjectId,
        viewer: ObjectId,
        page: &Page,
    ) -> ServiceResult<(Vec<Document>, Pagination)> {
        VideoService::new(self.db.clone()).require_visible(video_id, viewer).await?;
        let total = self.db.comments().count(doc! { "video": video_id }).await?;
        let comments = self
            .db
            .comments()
            .aggregate(video_comments_pipeline(video_id, viewer, page))
            .await?;
        Ok((comments, Pagination::new(total, page)))
    }

    pub async fn update(&self, comment_id: ObjectId, actor: ObjectId, content: &str) -> ServiceResult<Comment> {
        self.owned(comment_id, actor).await?;
        self.db
            .comments()
            .update_by_id(comment_id, doc! { "$set": { "content": content.trim() } }, "Comment already exists")
            .await?
            .ok_or_else(|| ServiceError::not_found("Comment not found"))
    }

    /// Delete a comment and the likes on it
    pub async fn delete(&self, comment_id: ObjectId, actor: ObjectId) -> ServiceResult<()> {
        self.owned(comment_id, actor).await?;
        self.db
            .comments()
            .delete_one(doc! { "_id": comment_id, "owner": actor })
            .await?
            .ok_or_else(|| ServiceError::not_found("Comment not found"))?;
        self.db.likes().delete_many(doc! { "comment": comment_id }).await?;
        Ok(())
    }

    async fn owned(&self, comment_id: ObjectId, actor: ObjectId) -> ServiceResult<Comment> {
        let comment = self
            .db
            .comments()
            .find_by_id(comment_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Comment not found"))?;
        ensure_owner(comment.owner, actor, "comment")?;
        Ok(comment)
    }
}

pub fn video_comments_pipeline(video_id: ObjectId, viewer: ObjectId, page: &Page) -> Pipeline {
    Pipeline::new()
        .match_on(doc! { "video": video_id })
        .sort(&Sort::newest())
        .paginate(page)
        .lookup(owner_lookup("owner", "ownerDetails"))
        .unwind("ownerDetails")
        .lookup(Lookup::new(DatabaseManager::LIKES, "_id", "comment", "likes"))
        .add_fields(doc! {
            "likesCount": size_of("likes"),
            "isLiked": contains(viewer, "likes.likedBy"),
        })
        .project(Projection::include(&[
            "content",
            "video",
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
    fn comments_join_owner_then_likes() {
        let video = ObjectId::new();
        let stages = video_comments_pipeline(video, ObjectId::new(), &Page { page: 1, limit: 10 }).into_stages();

        assert_eq!(stages[0], doc! { "$match": { "video": video } });
        assert_eq!(stages[1], doc! { "$sort": { "createdAt": -1, "_id": -1 } });

        let owner = stages[4].get_document("$lookup").unwrap();
        assert_eq!(owner.get_str("from").unwrap(), "users");
        assert_eq!(owner.get_str("as").unwrap(), "ownerDetails");
        assert_eq!(stages[5], doc! { "$unwind": "$ownerDetails" });

        let likes = stages[6].get_document("$lookup").unwrap();
        assert_eq!(likes.get_str("localField").unwrap(), "_id");
        assert_eq!(likes.get_str("foreignField").unwrap(), "comment");

        let projection = stages[8].get_document("$project").unwrap();
        assert!(projection.contains_key("likesCount"));
        assert!(!projection.contains_key("likes"));
    }
}
