// handlers/public/users.rs - POST /users/register, /users/login, /users/refresh-token

use axum::extract::{multipart::MultipartRejection, Multipart, State};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde_json::{json, Value};

use crate::api::format::public_user;
use crate::app::AppState;
use crate::auth::TokenPair;
use crate::error::ApiError;
use crate::handlers::multipart::MultipartForm;
use crate::handlers::{temp_dir, upload};
use crate::middleware::guard::{required, text, JsonBody, Schema};
use crate::middleware::{ApiResponse, ApiResult, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::services::users::Registration;
use crate::services::UserService;

const REGISTER: Schema = Schema::new(&[
    required("fullname", "Full name is required"),
    required("username", "Username is required"),
    required("email", "Email is required"),
    required("password", "Password is required"),
    required("avatar", "Avatar is required"),
]);

const LOGIN: Schema = Schema::new(&[required("password", "Password is required")]);

/// Create an account from a multipart form; `avatar` is required,
/// `coverImage` optional.
pub async fn register(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Value> {
    let multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let mut form = MultipartForm::parse(multipart, temp_dir(&state), &["avatar", "coverImage"]).await?;
    REGISTER.check(&form)?;

    let username = form.text("username").unwrap_or_default().to_string();
    let email = form.text("email").unwrap_or_default().to_string();

    let users = UserService::new(state.db.clone());
    users.ensure_available(&username, &email).await?;

    let avatar = form
        .take_file("avatar")
        .ok_or_else(|| ApiError::missing_field("avatar", "Avatar is required"))?;
    let avatar = upload(&state, avatar).await?;
    let cover_image_url = match form.take_file("coverImage") {
        Some(file) => upload(&state, file).await?.secure_url,
        None => String::new(),
    };

    let user = users
        .register(Registration {
            fullname: form.text("fullname").unwrap_or_default().to_string(),
            username,
            email,
            password: form.fields.get("password").cloned().unwrap_or_default(),
            avatar_url: avatar.secure_url,
            cover_image_url,
        })
        .await?;

    Ok(ApiResponse::ok(public_user(&user)?, "User registered successfully"))
}

/// Log in with `username` or `email` plus `password`
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(body): JsonBody,
) -> Result<(CookieJar, ApiResponse<Value>), ApiError> {
    let identifier = text(&body, "username")
        .filter(|s| !s.is_empty())
        .or_else(|| text(&body, "email").filter(|s| !s.is_empty()))
        .ok_or_else(|| ApiError::missing_field("username", "Username or email is required"))?;
    LOGIN.check(&body)?;
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();

    let (user, pair) = UserService::new(state.db.clone())
        .login(identifier, password, &state.config.security)
        .await?;

    let data = json!({
        "user": public_user(&user)?,
        "accessToken": pair.access_token,
        "refreshToken": pair.refresh_token,
    });
    Ok((
        set_session_cookies(jar, &pair, state.config.security.cookie_secure),
        ApiResponse::ok(data, "User logged in successfully"),
    ))
}

/// Rotate the session using the `refreshToken` cookie or body field
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(body): JsonBody,
) -> Result<(CookieJar, ApiResponse<Value>), ApiError> {
    let presented = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.trim().is_empty())
        .or_else(|| text(&body, "refreshToken").filter(|s| !s.is_empty()).map(str::to_string))
        .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

    let (_, pair) = UserService::new(state.db.clone())
        .refresh(&presented, &state.config.security)
        .await?;

    let data = json!({
        "accessToken": pair.access_token,
        "refreshToken": pair.refresh_token,
    });
    Ok((
        set_session_cookies(jar, &pair, state.config.security.cookie_secure),
        ApiResponse::ok(data, "Access token refreshed"),
    ))
}

pub fn set_session_cookies(jar: CookieJar, pair: &TokenPair, secure: bool) -> CookieJar {
    jar.add(session_cookie(ACCESS_TOKEN_COOKIE, pair.access_token.clone(), secure))
        .add(session_cookie(REFRESH_TOKEN_COOKIE, pair.refresh_token.clone(), secure))
}

pub fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_TOKEN_COOKIE).path("/"))
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .path("/")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookies_are_http_only() {
        let pair = TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
        };
        let jar = set_session_cookies(CookieJar::new(), &pair, true);

        let access = jar.get(ACCESS_TOKEN_COOKIE).unwrap();
        assert_eq!(access.value(), "a");
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.secure(), Some(true));
        assert_eq!(access.path(), Some("/"));
        assert_eq!(jar.get(REFRESH_TOKEN_COOKIE).unwrap().value(), "r");

        let cleared = clear_session_cookies(jar);
        assert!(cleared.get(ACCESS_TOKEN_COOKIE).is_none());
        assert!(cleared.get(REFRESH_TOKEN_COOKIE).is_none());
    }
}
