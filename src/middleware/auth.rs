use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use mongodb::bson::oid::ObjectId;

use crate::app::AppState;
use crate::auth::verify_access_token;
use crate::database::models::User;
use crate::error::ApiError;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// The authenticated user, loaded from the database for this request
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> Result<ObjectId, ApiError> {
        self.0
            .id
            .ok_or_else(|| ApiError::internal_server_error("Authenticated user has no id"))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Unauthorized access"))
    }
}

/// Resolve the access token to a user and attach it to the request.
///
/// The token is read from the `accessToken` cookie first, then from an
/// `Authorization: Bearer` header.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&jar, request.headers()).ok_or_else(|| {
        tracing::warn!("Rejected request to {} without an access token", request.uri().path());
        ApiError::unauthorized("Unauthorized request")
    })?;

    let claims = verify_access_token(&token, &state.config.security).map_err(|e| {
        tracing::warn!("Rejected access token: {}", e);
        ApiError::unauthorized("Invalid access token")
    })?;

    let user_id = ObjectId::parse_str(&claims.user_id)
        .map_err(|_| ApiError::unauthorized("Invalid access token"))?;

    let user = state.db.users().find_by_id(user_id).await?.ok_or_else(|| {
        tracing::warn!("Access token names unknown user {}", user_id);
        ApiError::unauthorized("Invalid access token")
    })?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

fn extract_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        if !cookie.value().trim().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
