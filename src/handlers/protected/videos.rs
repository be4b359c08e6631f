// handlers/protected/videos.rs - /videos routes

use axum::extract::{multipart::MultipartRejection, Multipart, Path, Query, State};
use serde_json::Value;

use crate::api::format::{document_to_json, model_to_json};
use crate::app::AppState;
use crate::database::Sort;
use crate::error::ApiError;
use crate::handlers::multipart::MultipartForm;
use crate::handlers::{paged_documents, path_id, temp_dir, upload, ListParams};
use crate::middleware::guard::{parse_object_id, required, text, JsonBody, Schema};
use crate::middleware::{empty, ApiResponse, ApiResult, CurrentUser};
use crate::services::videos::{NewVideo, VideoQuery, SORTABLE_FIELDS};
use crate::services::VideoService;

const VIDEO_ID: Schema = Schema::new(&[required("videoId", "Video id is required")]);

const UPLOAD: Schema = Schema::new(&[
    required("title", "Title is required"),
    required("description", "Description is required"),
    required("videoFile", "Video file is required"),
    required("thumbnail", "Thumbnail is required"),
]);

const DETAILS: Schema = Schema::new(&[
    required("title", "Title is required"),
    required("description", "Description is required"),
]);

const VIDEO_FILE: Schema = Schema::new(&[required("videoFile", "Video file is required")]);
const THUMBNAIL: Schema = Schema::new(&[required("thumbnail", "Thumbnail is required")]);

/// GET /getAll-videos?page&limit&query&sortBy&sortType&userId
pub async fn list_videos(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Value> {
    let owner = match params.user_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_object_id("userId", raw)?),
        None => None,
    };
    let query = VideoQuery {
        page: params.page(&state),
        sort: Sort::from_query(params.sort_by.as_deref(), params.sort_type.as_deref(), SORTABLE_FIELDS),
        search: params
            .query
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        owner,
    };

    let (videos, pagination) = VideoService::new(state.db.clone()).list(&query, user.id()?).await?;
    Ok(ApiResponse::ok(
        paged_documents("videos", videos, pagination),
        "Videos fetched successfully",
    ))
}

/// POST /upload-video (multipart: title, description, videoFile, thumbnail)
pub async fn upload_video(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Value> {
    let multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let mut form = MultipartForm::parse(multipart, temp_dir(&state), &["videoFile", "thumbnail"]).await?;
    UPLOAD.check(&form)?;

    let owner = user.id()?;
    let title = form.text("title").unwrap_or_default().to_string();
    let description = form.text("description").unwrap_or_default().to_string();

    let videos = VideoService::new(state.db.clone());
    videos.ensure_title_free(owner, &title).await?;

    let (video_file, thumbnail) = match (form.take_file("videoFile"), form.take_file("thumbnail")) {
        (Some(video_file), Some(thumbnail)) => (video_file, thumbnail),
        (None, _) => return Err(ApiError::missing_field("videoFile", "Video file is required")),
        (_, None) => return Err(ApiError::missing_field("thumbnail", "Thumbnail is required")),
    };
    let video_file = upload(&state, video_file).await?;
    let thumbnail = upload(&state, thumbnail).await?;

    let video = videos
        .publish(
            owner,
            NewVideo {
                title,
                description,
                video_url: video_file.secure_url,
                thumbnail_url: thumbnail.secure_url,
                duration: video_file.duration.unwrap_or(0.0),
            },
        )
        .await?;

    Ok(ApiResponse::ok(model_to_json(&video)?, "Video uploaded successfully"))
}

/// GET /c/:videoId - counts a view and records it in the viewer's history
pub async fn get_video(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(video_id): Path<String>,
) -> ApiResult<Value> {
    let video_id = path_id(&VIDEO_ID, "videoId", &video_id)?;
    let video = VideoService::new(state.db.clone()).watch(video_id, user.id()?).await?;
    Ok(ApiResponse::ok(document_to_json(video), "Video fetched successfully"))
}

pub async fn update_video(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(video_id): Path<String>,
    JsonBody(body): JsonBody,
) -> ApiResult<Value> {
    let video_id = path_id(&VIDEO_ID, "videoId", &video_id)?;
    DETAILS.check(&body)?;
    let video = VideoService::new(state.db.clone())
        .update_details(
            video_id,
            user.id()?,
            text(&body, "title").unwrap_or_default(),
            text(&body, "description").unwrap_or_default(),
        )
        .await?;
    Ok(ApiResponse::ok(model_to_json(&video)?, "Video details updated successfully"))
}

pub async fn toggle_publish(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(video_id): Path<String>,
) -> ApiResult<Value> {
    let video_id = path_id(&VIDEO_ID, "videoId", &video_id)?;
    let video = VideoService::new(state.db.clone())
        .toggle_publish(video_id, user.id()?)
        .await?;
    let message = if video.is_published {
        "Video published successfully"
    } else {
        "Video unpublished successfully"
    };
    Ok(ApiResponse::ok(model_to_json(&video)?, message))
}

pub async fn delete_video(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(video_id): Path<String>,
) -> ApiResult<Value> {
    let video_id = path_id(&VIDEO_ID, "videoId", &video_id)?;
    VideoService::new(state.db.clone()).delete(video_id, user.id()?).await?;
    Ok(ApiResponse::ok(empty(), "Video deleted successfully"))
}

/// PATCH /c/:videoId/video-file (multipart: videoFile)
pub async fn replace_video_file(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(video_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Value> {
    let video_id = path_id(&VIDEO_ID, "videoId", &video_id)?;
    let actor = user.id()?;
    let multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let mut form = MultipartForm::parse(multipart, temp_dir(&state), &["videoFile"]).await?;
    VIDEO_FILE.check(&form)?;

    let videos = VideoService::new(state.db.clone());
    videos.owned(video_id, actor).await?;

    let file = form
        .take_file("videoFile")
        .ok_or_else(|| ApiError::missing_field("videoFile", "Video file is required"))?;
    let uploaded = upload(&state, file).await?;
    let video = videos
        .replace_file(video_id, actor, &uploaded.secure_url, uploaded.duration)
        .await?;
    Ok(ApiResponse::ok(model_to_json(&video)?, "Video file updated successfully"))
}

/// PATCH /c/:videoId/thumbnail (multipart: thumbnail)
pub async fn replace_thumbnail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(video_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Value> {
    let video_id = path_id(&VIDEO_ID, "videoId", &video_id)?;
    let actor = user.id()?;
    let multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let mut form = MultipartForm::parse(multipart, temp_dir(&state), &["thumbnail"]).await?;
    THUMBNAIL.check(&form)?;

    let videos = VideoService::new(state.db.clone());
    videos.owned(video_id, actor).await?;

    let file = form
        .take_file("thumbnail")
        .ok_or_else(|| ApiError::missing_field("thumbnail", "Thumbnail is required"))?;
    let uploaded = upload(&state, file).await?;
    let video = videos
        .replace_thumbnail(video_id, actor, &uploaded.secure_url)
        .await?;
    Ok(ApiResponse::ok(model_to_json(&video)?, "Thumbnail updated successfully"))
}
