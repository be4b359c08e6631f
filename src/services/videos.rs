use mongodb::bson::{doc, oid::ObjectId, Document};

use crate::database::models::Video;
use crate::database::pipeline::{contains, size_of, Lookup, Pipeline, Projection};
use crate::database::{DatabaseManager, Page, Pagination, Sort};

use super::{ensure_owner, owner_lookup, ServiceError, ServiceResult};

const DUPLICATE_VIDEO: &str = "Video already exists";

/// Fields clients may sort the video list by
pub const SORTABLE_FIELDS: &[&str] = &["createdAt", "updatedAt", "views", "duration", "title"];

const VIDEO_FIELDS: &[&str] = &[
    "title",
    "description",
    "videoFile",
    "thumbnail",
    "duration",
    "views",
    "isPublished",
    "owner",
    "createdAt",
    "updatedAt",
];

#[derive(Debug, Clone)]
pub struct VideoQuery {
    pub page: Page,
    pub sort: Sort,
    /// Full-text search over title and description
    pub search: Option<String>,
    pub owner: Option<ObjectId>,
}

/// A new video, after both files have been uploaded
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub duration: f64,
}

pub struct VideoService {
    db: DatabaseManager,
}

impl VideoService {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    pub async fn list(&self, query: &VideoQuery, viewer: ObjectId) -> ServiceResult<(Vec<Document>, Pagination)> {
        let filter = list_filter(query, viewer);
        let total = self.db.videos().count(filter.clone()).await?;
        let videos = self
            .db
            .videos()
            .aggregate(list_pipeline(filter, &query.sort, &query.page))
            .await?;
        Ok((videos, Pagination::new(total, &query.page)))
    }

    /// Refuse a title the owner already used, before anything is uploaded
    pub async fn ensure_title_free(&self, owner: ObjectId, title: &str) -> ServiceResult<()> {
        if self
            .db
            .videos()
            .exists(doc! { "owner": owner, "title": title.trim() })
            .await?
        {
            return Err(ServiceError::Conflict(DUPLICATE_VIDEO.to_string()));
        }
        Ok(())
    }

    pub async fn publish(&self, owner: ObjectId, video: NewVideo) -> ServiceResult<Video> {
        let video = Video::new(
            owner,
            &video.title,
            &video.description,
            &video.video_url,
            &video.thumbnail_url,
            video.duration,
        );
        let video = self.db.videos().insert(video, DUPLICATE_VIDEO).await?;
        tracing::info!("Published video {:?} for {}", video.id, owner);
        Ok(video)
    }

    /// Fetch a video for display. Counts a view and moves the video to the
    /// end of the viewer's watch history. Unpublished videos are visible to
    /// their owner only.
    pub async fn watch(&self, video_id: ObjectId, viewer: ObjectId) -> ServiceResult<Document> {
        self.require_visible(video_id, viewer).await?;

        self.db
            .videos()
            .update_many(doc! { "_id": video_id }, doc! { "$inc": { "views": 1_i64 } })
            .await?;
        self.db
            .users()
            .update_many(doc! { "_id": viewer }, record_view_stages(video_id))
            .await?;

        self.db
            .videos()
            .aggregate(detail_pipeline(video_id, viewer))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found("Video not found"))
    }

    /// 404 unless the video exists and `viewer` may see it
    pub async fn require_visible(&self, video_id: ObjectId, viewer: ObjectId) -> ServiceResult<()> {
        if !self.db.videos().exists(visible_video(video_id, viewer)).await? {
            return Err(ServiceError::not_found("Video not found"));
        }
        Ok(())
    }

    /// Load a video the actor owns: 404 when missing, 403 when someone else's
    pub async fn owned(&self, video_id: ObjectId, actor: ObjectId) -> ServiceResult<Video> {
        let video = self
            .db
            .videos()
            .find_by_id(video_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Video not found"))?;
        ensure_owner(video.owner, actor, "video")?;
        Ok(video)
    }

    pub async fn update_details(
        &self,
        video_id: ObjectId,
        actor: ObjectId,
        title: &str,
        description: &str,
    ) -> ServiceResult<Video> {
        self.owned(video_id, actor).await?;
        self.update_owned(
            video_id,
            actor,
            doc! { "$set": { "title": title.trim(), "description": description.trim() } },
        )
        .await
    }

    pub async fn replace_file(
        &self,
        video_id: ObjectId,
        actor: ObjectId,
        url: &str,
        duration: Option<f64>,
    ) -> ServiceResult<Video> {
        let mut set = doc! { "videoFile": url };
        if let Some(duration) = duration {
            set.insert("duration", duration);
        }
        self.update_owned(video_id, actor, doc! { "$set": set }).await
    }

    pub async fn replace_thumbnail(&self, video_id: ObjectId, actor: ObjectId, url: &str) -> ServiceResult<Video> {
        self.update_owned(video_id, actor, doc! { "$set": { "thumbnail": url } })
            .await
    }

    /// Flip `isPublished` in a single server-side update
    pub async fn toggle_publish(&self, video_id: ObjectId, actor: ObjectId) -> ServiceResult<Video> {
        self.owned(video_id, actor).await?;
        self.db
            .videos()
            .update_with_pipeline(
                doc! { "_id": video_id, "owner": actor },
                vec![doc! { "$set": { "isPublished": { "$not": "$isPublished" } } }],
            )
            .await?
            .ok_or_else(|| ServiceError::not_found("Video not found"))
    }

    /// Delete a video with its comments, every like pointing at it or at
    /// those comments, and its playlist and history entries.
    pub async fn delete(&self, video_id: ObjectId, actor: ObjectId) -> ServiceResult<()> {
        self.owned(video_id, actor).await?;
        self.db
            .videos()
            .delete_one(doc! { "_id": video_id, "owner": actor })
            .await?
            .ok_or_else(|| ServiceError::not_found("Video not found"))?;

        let comment_ids = self.db.comments().ids(doc! { "video": video_id }).await?;
        let likes = self
            .db
            .likes()
            .delete_many(doc! { "$or": [{ "video": video_id }, { "comment": { "$in": comment_ids } }] })
            .await?;
        let comments = self.db.comments().delete_many(doc! { "video": video_id }).await?;
        self.db
            .playlists()
            .update_many(doc! { "videos": video_id }, doc! { "$pull": { "videos": video_id } })
            .await?;
        self.db
            .users()
            .update_many(doc! { "watchHistory": video_id }, doc! { "$pull": { "watchHistory": video_id } })
            .await?;

        tracing::info!(
            "Deleted video {} with {} comment(s) and {} like(s)",
            video_id,
            comments,
            likes
        );
        Ok(())
    }

    async fn update_owned(&self, video_id: ObjectId, actor: ObjectId, update: Document) -> ServiceResult<Video> {
        self.db
            .videos()
            .update_one(doc! { "_id": video_id, "owner": actor }, update, DUPLICATE_VIDEO)
            .await?
            .ok_or_else(|| ServiceError::not_found("Video not found"))
    }
}

/// Videos `viewer` may see: every published video and their own
pub fn visible_to(viewer: ObjectId) -> Document {
    doc! { "$or": [{ "isPublished": true }, { "owner": viewer }] }
}

pub fn visible_video(video_id: ObjectId, viewer: ObjectId) -> Document {
    let mut filter = doc! { "_id": video_id };
    filter.extend(visible_to(viewer));
    filter
}

/// Published videos, optionally of one owner and matching a text search.
/// Owners listing their own channel also see their unpublished videos.
pub fn list_filter(query: &VideoQuery, viewer: ObjectId) -> Document {
    let mut filter = Document::new();
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        filter.insert("$text", doc! { "$search": search });
    }
    match query.owner {
        Some(owner) if owner == viewer => {
            filter.insert("owner", owner);
        }
        Some(owner) => {
            filter.insert("owner", owner);
            filter.insert("isPublished", true);
        }
        None => {
            filter.insert("isPublished", true);
        }
    }
    filter
}

pub fn list_pipeline(filter: Document, sort: &Sort, page: &Page) -> Pipeline {
    Pipeline::new()
        .match_on(filter)
        .sort(sort)
        .paginate(page)
        .lookup(owner_lookup("owner", "owner"))
        .first("owner")
        .project(Projection::include(VIDEO_FIELDS))
}

pub fn detail_pipeline(video_id: ObjectId, viewer: ObjectId) -> Pipeline {
    let mut fields: Vec<&str> = VIDEO_FIELDS.to_vec();
    fields.extend(["likesCount", "isLiked"]);

    Pipeline::new()
        .match_on(doc! { "_id": video_id })
        .lookup(Lookup::new(DatabaseManager::LIKES, "_id", "video", "likes"))
        .lookup(owner_lookup("owner", "owner"))
        .first("owner")
        .add_fields(doc! {
            "likesCount": size_of("likes"),
            "isLiked": contains(viewer, "likes.likedBy"),
        })
        .project(Projection::include(&fields))
}

/// Update stages that move `video_id` to the end of `watchHistory`
pub fn record_view_stages(video_id: ObjectId) -> Vec<Document> {
    vec![doc! {
        "$set": {
            "watchHistory": {
                "$concatArrays": [
                    {
                        "$filter": {
                            "input": { "$ifNull": ["$watchHistory", []] },
                            "cond": { "$ne": ["$$this", video_id] }
                        }
                    },
                    [video_id]
                ]
            }
        }
    }]
}
