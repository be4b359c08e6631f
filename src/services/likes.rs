use mongodb::bson::{doc, oid::ObjectId, Bson, Document};

use crate::database::models::{Like, LikeTarget};
use crate::database::pipeline::{Lookup, Pipeline, Projection};
use crate::database::{DatabaseManager, Page, Pagination, Toggle};

use super::videos::{visible_to, visible_video};
use super::{owner_lookup, ServiceError, ServiceResult};

pub struct LikeService {
    db: DatabaseManager,
}

impl LikeService {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    /// Like the target if the actor has not yet, otherwise remove the like.
    /// Videos the actor may not see are 404.
    pub async fn toggle(&self, target: LikeTarget, actor: ObjectId) -> ServiceResult<Toggle<Like>> {
        let exists = match target {
            LikeTarget::Video(id) => self.db.videos().exists(visible_video(id, actor)).await?,
            LikeTarget::Comment(id) => self.db.comments().exists(doc! { "_id": id }).await?,
            LikeTarget::Tweet(id) => self.db.tweets().exists(doc! { "_id": id }).await?,
        };
        if !exists {
            return Err(ServiceError::not_found(format!("{} not found", target.label())));
        }

        let outcome = self
            .db
            .likes()
            .toggle(target.key(actor), || Like::new(target, actor))
            .await?;
        tracing::debug!("{} {} like by {}: on = {}", target.label(), target.id(), actor, outcome.is_on());
        Ok(outcome)
    }

    /// Videos the actor liked and can still see, most recent like first
    pub async fn liked_videos(&self, actor: ObjectId, page: &Page) -> ServiceResult<(Vec<Document>, Pagination)> {
        let total = self
            .db
            .likes()
            .aggregate(liked_videos_base(actor).count("total"))
            .await?
            .first()
            .and_then(|row| match row.get("total") {
                Some(Bson::Int32(n)) => u64::try_from(*n).ok(),
                Some(Bson::Int64(n)) => u64::try_from(*n).ok(),
                _ => None,
            })
            .unwrap_or(0);
        let videos = self
            .db
            .likes()
            .aggregate(liked_videos_pipeline(actor, page))
            .await?;
        Ok((videos, Pagination::new(total, page)))
    }
}

/// Like rows of `actor` joined to the videos they may see. Likes on videos
/// that were since unpublished by someone else drop out at the unwind.
fn liked_videos_base(actor: ObjectId) -> Pipeline {
    Pipeline::new()
        .match_on(doc! { "likedBy": actor, "video": { "$exists": true } })
        .sort_by(crate::database::paging::newest_first())
        .lookup(
            Lookup::new(DatabaseManager::VIDEOS, "video", "_id", "likedVideo")
                .with_pipeline(Pipeline::new().match_on(visible_to(actor))),
        )
        .unwind("likedVideo")
}

pub fn liked_videos_pipeline(actor: ObjectId, page: &Page) -> Pipeline {
    liked_videos_base(actor)
        .paginate(page)
        .replace_root("likedVideo")
        .lookup(owner_lookup("owner", "owner"))
        .first("owner")
        .project(Projection::include(&[
            "title",
            "description",
            "videoFile",
            "thumbnail",
            "duration",
            "views",
            "owner",
            "createdAt",
        ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liked_videos_join_from_like_to_visible_video() {
        let actor = ObjectId::new();
        let stages = liked_videos_pipeline(actor, &Page { page: 1, limit: 10 }).into_stages();

        assert_eq!(
            stages[0],
            doc! { "$match": { "likedBy": actor, "video": { "$exists": true } } }
        );
        assert_eq!(stages[1], doc! { "$sort": { "createdAt": -1, "_id": -1 } });

        let videos = stages[2].get_document("$lookup").unwrap();
        assert_eq!(videos.get_str("from").unwrap(), "videos");
        assert_eq!(videos.get_str("localField").unwrap(), "video");
        assert_eq!(videos.get_str("foreignField").unwrap(), "_id");
        let nested = videos.get_array("pipeline").unwrap();
        assert_eq!(
            nested[0].as_document().unwrap(),
            &doc! { "$match": { "$or": [{ "isPublished": true }, { "owner": actor }] } }
        );

        assert_eq!(stages[3], doc! { "$unwind": "$likedVideo" });
        assert_eq!(stages[4], doc! { "$skip": 0_i64 });
        assert_eq!(stages[6], doc! { "$replaceRoot": { "newRoot": "$likedVideo" } });
    }

    #[test]
    fn liked_videos_total_counts_after_the_visibility_join() {
        let actor = ObjectId::new();
        let stages = liked_videos_base(actor).count("total").into_stages();
        assert_eq!(stages[3], doc! { "$unwind": "$likedVideo" });
        assert_eq!(stages[4], doc! { "$count": "total" });
    }
}
