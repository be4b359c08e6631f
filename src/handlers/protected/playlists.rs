// handlers/protected/playlists.rs - /playlists routes

use axum::extract::{Path, Query, State};
use mongodb::bson::oid::ObjectId;
use serde_json::Value;

use crate::api::format::{bson_to_json, model_to_json, models_to_json};
use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::{paged, path_id, ListParams};
use crate::middleware::guard::{parse_object_id, required, text, JsonBody, PathParam, Schema};
use crate::middleware::{empty, ApiResponse, ApiResult, CurrentUser};
use crate::services::PlaylistService;

const CREATE: Schema = Schema::new(&[
    required("name", "Name is required"),
    required("description", "Description is required"),
]);

const PLAYLIST_ID: Schema = Schema::new(&[required("playlistId", "Playlist id is required")]);
const USER_ID: Schema = Schema::new(&[required("userId", "User id is required")]);

const PLAYLIST_VIDEO: Schema = Schema::new(&[
    required("playlistId", "Playlist id is required"),
    required("videoId", "Video id is required"),
]);

/// POST /create-playlist `{name, description, videos?}`
pub async fn create_playlist(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Value> {
    CREATE.check(&body)?;
    let videos = video_ids(&body)?;
    let playlist = PlaylistService::new(state.db.clone())
        .create(
            user.id()?,
            text(&body, "name").unwrap_or_default(),
            text(&body, "description").unwrap_or_default(),
            videos,
        )
        .await?;
    Ok(ApiResponse::ok(model_to_json(&playlist)?, "Playlist created successfully"))
}

/// Optional `videos` array of id strings
fn video_ids(body: &Value) -> Result<Vec<ObjectId>, ApiError> {
    match body.get("videos") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| ApiError::bad_request("Invalid videos"))
                    .and_then(|raw| parse_object_id("videos", raw))
            })
            .collect(),
        Some(_) => Err(ApiError::bad_request("Invalid videos")),
    }
}

pub async fn get_playlist(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(playlist_id): Path<String>,
) -> ApiResult<Value> {
    let playlist_id = path_id(&PLAYLIST_ID, "playlistId", &playlist_id)?;
    let playlist = PlaylistService::new(state.db.clone()).get(playlist_id).await?;
    Ok(ApiResponse::ok(model_to_json(&playlist)?, "Playlist fetched successfully"))
}

/// PATCH /c/:playlistId `{name?, description?}`
pub async fn update_playlist(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(playlist_id): Path<String>,
    JsonBody(body): JsonBody,
) -> ApiResult<Value> {
    let playlist_id = path_id(&PLAYLIST_ID, "playlistId", &playlist_id)?;
    let description = body.get("description").and_then(Value::as_str);
    let playlist = PlaylistService::new(state.db.clone())
        .update(playlist_id, user.id()?, text(&body, "name"), description)
        .await?;
    Ok(ApiResponse::ok(model_to_json(&playlist)?, "Playlist updated successfully"))
}

pub async fn delete_playlist(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(playlist_id): Path<String>,
) -> ApiResult<Value> {
    let playlist_id = path_id(&PLAYLIST_ID, "playlistId", &playlist_id)?;
    PlaylistService::new(state.db.clone())
        .delete(playlist_id, user.id()?)
        .await?;
    Ok(ApiResponse::ok(empty(), "Playlist deleted successfully"))
}

/// GET /c/:playlistId/videos - published videos only
pub async fn playlist_videos(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(playlist_id): Path<String>,
) -> ApiResult<Value> {
    let playlist_id = path_id(&PLAYLIST_ID, "playlistId", &playlist_id)?;
    let videos = PlaylistService::new(state.db.clone()).videos(playlist_id).await?;
    let videos = videos.into_iter().map(bson_to_json).collect();
    Ok(ApiResponse::ok(Value::Array(videos), "Videos fetched successfully"))
}

pub async fn add_video(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((playlist_id, video_id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let (playlist_id, video_id) = playlist_and_video(&playlist_id, &video_id)?;
    let playlist = PlaylistService::new(state.db.clone())
        .add_video(playlist_id, video_id, user.id()?)
        .await?;
    Ok(ApiResponse::ok(model_to_json(&playlist)?, "Video added to playlist successfully"))
}

pub async fn remove_video(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((playlist_id, video_id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let (playlist_id, video_id) = playlist_and_video(&playlist_id, &video_id)?;
    let playlist = PlaylistService::new(state.db.clone())
        .remove_video(playlist_id, video_id, user.id()?)
        .await?;
    Ok(ApiResponse::ok(
        model_to_json(&playlist)?,
        "Video removed from playlist successfully",
    ))
}

fn playlist_and_video(playlist_id: &str, video_id: &str) -> Result<(ObjectId, ObjectId), ApiError> {
    PLAYLIST_VIDEO.check(&(
        PathParam("playlistId", playlist_id),
        PathParam("videoId", video_id),
    ))?;
    Ok((
        parse_object_id("playlistId", playlist_id)?,
        parse_object_id("videoId", video_id)?,
    ))
}

pub async fn user_playlists(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(user_id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Value> {
    let user_id = path_id(&USER_ID, "userId", &user_id)?;
    let (playlists, pagination) = PlaylistService::new(state.db.clone())
        .by_user(user_id, &params.page(&state))
        .await?;
    Ok(ApiResponse::ok(
        paged("playlists", models_to_json(&playlists)?, pagination),
        "User playlists fetched successfully",
    ))
}
