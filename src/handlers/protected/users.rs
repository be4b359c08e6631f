// handlers/protected/users.rs - Account endpoints for the logged-in user

use axum::extract::{multipart::MultipartRejection, Multipart, Path, State};
use axum_extra::extract::cookie::CookieJar;
use serde_json::Value;

use crate::api::format::{bson_to_json, document_to_json, public_user};
use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::multipart::MultipartForm;
use crate::handlers::public::users::clear_session_cookies;
use crate::handlers::{temp_dir, upload};
use crate::middleware::guard::{required, text, JsonBody, PathParam, Schema};
use crate::middleware::{empty, ApiResponse, ApiResult, CurrentUser};
use crate::services::users::ImageField;
use crate::services::UserService;

const CHANGE_PASSWORD: Schema = Schema::new(&[
    required("oldPassword", "Old password is required"),
    required("newPassword", "New password is required"),
    required("confirmPassword", "Confirm password is required"),
]);

const UPDATE_ACCOUNT: Schema = Schema::new(&[
    required("fullname", "Full name is required"),
    required("email", "Email is required"),
]);

const AVATAR: Schema = Schema::new(&[required("avatar", "Avatar is required")]);
const COVER_IMAGE: Schema = Schema::new(&[required("coverImage", "CoverImage is required")]);
const CHANNEL: Schema = Schema::new(&[required("username", "The username is not present")]);

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    user: CurrentUser,
) -> Result<(CookieJar, ApiResponse<Value>), ApiError> {
    UserService::new(state.db.clone()).logout(user.id()?).await?;
    Ok((
        clear_session_cookies(jar),
        ApiResponse::ok(empty(), "Logged out successfully"),
    ))
}

pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Value> {
    CHANGE_PASSWORD.check(&body)?;
    UserService::new(state.db.clone())
        .change_password(
            &user,
            raw(&body, "oldPassword"),
            raw(&body, "newPassword"),
            raw(&body, "confirmPassword"),
        )
        .await?;
    Ok(ApiResponse::ok(empty(), "Password updated successfully"))
}

/// Untrimmed string field; passwords are used exactly as sent
fn raw<'a>(body: &'a Value, name: &str) -> &'a str {
    body.get(name).and_then(Value::as_str).unwrap_or_default()
}

pub async fn current_user(CurrentUser(user): CurrentUser) -> ApiResult<Value> {
    Ok(ApiResponse::ok(public_user(&user)?, "Fetched the current user"))
}

pub async fn update_account(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Value> {
    UPDATE_ACCOUNT.check(&body)?;
    let updated = UserService::new(state.db.clone())
        .update_account(
            user.id()?,
            text(&body, "fullname").unwrap_or_default(),
            text(&body, "email").unwrap_or_default(),
        )
        .await?;
    Ok(ApiResponse::ok(public_user(&updated)?, "Details updated successfully"))
}

pub async fn update_avatar(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Value> {
    let updated = replace_image(&state, &user, multipart, ImageField::Avatar, &AVATAR).await?;
    Ok(ApiResponse::ok(public_user(&updated)?, "Avatar changed successfully"))
}

pub async fn update_cover_image(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Value> {
    let updated = replace_image(&state, &user, multipart, ImageField::CoverImage, &COVER_IMAGE).await?;
    Ok(ApiResponse::ok(public_user(&updated)?, "CoverImage changed successfully"))
}

async fn replace_image(
    state: &AppState,
    user: &CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
    field: ImageField,
    schema: &Schema,
) -> Result<crate::database::models::User, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let mut form = MultipartForm::parse(multipart, temp_dir(state), &[field.as_str()]).await?;
    schema.check(&form)?;

    let file = form
        .take_file(field.as_str())
        .ok_or_else(|| ApiError::missing_field(field.as_str(), "File is required"))?;
    let uploaded = upload(state, file).await?;

    Ok(UserService::new(state.db.clone())
        .set_image(user.id()?, field, &uploaded.secure_url)
        .await?)
}

/// Public profile of a channel with subscriber counts
pub async fn channel_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> ApiResult<Value> {
    CHANNEL.check(&PathParam("username", &username))?;
    let channel = UserService::new(state.db.clone())
        .channel_profile(&username, user.id()?)
        .await?;
    Ok(ApiResponse::ok(document_to_json(channel), "User details fetched successfully"))
}

pub async fn watch_history(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Value> {
    let videos = UserService::new(state.db.clone()).watch_history(user.id()?).await?;
    let videos = videos.into_iter().map(bson_to_json).collect();
    Ok(ApiResponse::ok(Value::Array(videos), "Watch history fetched successfully"))
}
