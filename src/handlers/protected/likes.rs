// handlers/protected/likes.rs - /likes routes

use axum::extract::{Path, Query, State};
use mongodb::bson::oid::ObjectId;
use serde_json::Value;

use crate::api::format::model_to_json;
use crate::app::AppState;
use crate::database::models::LikeTarget;
use crate::database::Toggle;
use crate::handlers::{paged_documents, path_id, ListParams};
use crate::middleware::guard::{required, Schema};
use crate::middleware::{empty, ApiResponse, ApiResult, CurrentUser};
use crate::services::LikeService;

const VIDEO_ID: Schema = Schema::new(&[required("videoId", "Video id is required")]);
const COMMENT_ID: Schema = Schema::new(&[required("commentId", "Comment id is required")]);
const TWEET_ID: Schema = Schema::new(&[required("tweetId", "Tweet id is required")]);

pub async fn toggle_video_like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(video_id): Path<String>,
) -> ApiResult<Value> {
    let target = LikeTarget::Video(path_id(&VIDEO_ID, "videoId", &video_id)?);
    toggle(&state, target, user.id()?).await
}

pub async fn toggle_comment_like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<String>,
) -> ApiResult<Value> {
    let target = LikeTarget::Comment(path_id(&COMMENT_ID, "commentId", &comment_id)?);
    toggle(&state, target, user.id()?).await
}

pub async fn toggle_tweet_like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(tweet_id): Path<String>,
) -> ApiResult<Value> {
    let target = LikeTarget::Tweet(path_id(&TWEET_ID, "tweetId", &tweet_id)?);
    toggle(&state, target, user.id()?).await
}

async fn toggle(state: &AppState, target: LikeTarget, actor: ObjectId) -> ApiResult<Value> {
    match LikeService::new(state.db.clone()).toggle(target, actor).await? {
        Toggle::Added(like) => Ok(ApiResponse::ok(
            model_to_json(&like)?,
            format!("{} liked successfully", target.label()),
        )),
        Toggle::Removed => Ok(ApiResponse::ok(
            empty(),
            format!("{} unliked successfully", target.label()),
        )),
    }
}

pub async fn liked_videos(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Value> {
    let (videos, pagination) = LikeService::new(state.db.clone())
        .liked_videos(user.id()?, &params.page(&state))
        .await?;
    Ok(ApiResponse::ok(
        paged_documents("likedVideos", videos, pagination),
        "Liked videos fetched successfully",
    ))
}
