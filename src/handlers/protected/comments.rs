// handlers/protected/comments.rs - /comments routes
//
// POST and GET on /c/:id take a video id; PATCH and DELETE take a comment id.

use axum::extract::{Path, Query, State};
use serde_json::Value;

use crate::api::format::model_to_json;
use crate::app::AppState;
use crate::handlers::{paged_documents, path_id, ListParams};
use crate::middleware::guard::{parse_object_id, required, text, JsonBody, PathParam, Schema};
use crate::middleware::{empty, ApiResponse, ApiResult, CurrentUser};
use crate::services::CommentService;

const ADD: Schema = Schema::new(&[
    required("videoId", "Video is missing"),
    required("content", "Content is required"),
]);

const UPDATE: Schema = Schema::new(&[
    required("commentId", "Comment id is required"),
    required("content", "Content is required"),
]);

const VIDEO_ID: Schema = Schema::new(&[required("videoId", "Video is missing")]);
const COMMENT_ID: Schema = Schema::new(&[required("commentId", "Comment id is required")]);

pub async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(video_id): Path<String>,
    JsonBody(body): JsonBody,
) -> ApiResult<Value> {
    ADD.check(&(PathParam("videoId", &video_id), &body))?;
    let video_id = parse_object_id("videoId", &video_id)?;

    let comment = CommentService::new(state.db.clone())
        .add(video_id, user.id()?, text(&body, "content").unwrap_or_default())
        .await?;
    Ok(ApiResponse::created(model_to_json(&comment)?, "Comment added successfully"))
}

pub async fn video_comments(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(video_id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Value> {
    let video_id = path_id(&VIDEO_ID, "videoId", &video_id)?;
    let (comments, pagination) = CommentService::new(state.db.clone())
        .list(video_id, user.id()?, &params.page(&state))
        .await?;
    Ok(ApiResponse::ok(
        paged_documents("comments", comments, pagination),
        "Video comments fetched successfully",
    ))
}

pub async fn update_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<String>,
    JsonBody(body): JsonBody,
) -> ApiResult<Value> {
    UPDATE.check(&(PathParam("commentId", &comment_id), &body))?;
    let comment_id = parse_object_id("commentId", &comment_id)?;

    let comment = CommentService::new(state.db.clone())
        .update(comment_id, user.id()?, text(&body, "content").unwrap_or_default())
        .await?;
    Ok(ApiResponse::ok(model_to_json(&comment)?, "Comment updated successfully"))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<String>,
) -> ApiResult<Value> {
    let comment_id = path_id(&COMMENT_ID, "commentId", &comment_id)?;
    CommentService::new(state.db.clone())
        .delete(comment_id, user.id()?)
        .await?;
    Ok(ApiResponse::ok(empty(), "Comment deleted successfully"))
}
