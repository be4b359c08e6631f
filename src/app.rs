// app.rs - Shared state and the HTTP router
//
// Every resource lives under /api/v1/<resource>. Routes added before
// `route_layer(require_auth)` in a resource router need a valid access token;
// the public user routes are added after it.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, Uri,
    },
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::{AppConfig, MediaBackend};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::{require_auth, ApiResponse, ApiResult};
use crate::services::MediaStore;

pub const API_PREFIX: &str = "/api/v1";

/// Handles shared by every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseManager,
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseManager, media: Arc<dyn MediaStore>) -> Self {
        Self {
            config: Arc::new(config),
            db,
            media,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/users", user_routes(&state))
        .nest("/videos", video_routes(&state))
        .nest("/comments", comment_routes(&state))
        .nest("/likes", like_routes(&state))
        .nest("/tweets", tweet_routes(&state))
        .nest("/playlists", playlist_routes(&state))
        .nest("/subscription", subscription_routes(&state));

    let mut app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest(API_PREFIX, api)
        .fallback(not_found);

    if state.config.media.backend == MediaBackend::Local {
        app = app.nest_service("/static", ServeDir::new(&state.config.media.local_dir));
    }

    app.layer(DefaultBodyLimit::max(state.config.server.max_json_bytes))
        .layer(cors_layer(&state.config.server.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Multipart routes get the larger upload limit
fn upload_limit(state: &AppState) -> DefaultBodyLimit {
    DefaultBodyLimit::max(state.config.server.max_upload_bytes)
}

fn user_routes(state: &AppState) -> Router<AppState> {
    use protected::users;

    Router::new()
        .route("/logout", post(users::logout))
        .route("/change-password", post(users::change_password))
        .route("/current-user", get(users::current_user))
        .route("/update-account", patch(users::update_account))
        .route("/avatar", patch(users::update_avatar).layer(upload_limit(state)))
        .route("/cover-image", patch(users::update_cover_image).layer(upload_limit(state)))
        .route("/c/:username", get(users::channel_profile))
        .route("/history", get(users::watch_history))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        // Public
        .route("/register", post(public::register).layer(upload_limit(state)))
        .route("/login", post(public::login))
        .route("/refresh-token", post(public::refresh_token))
}

fn video_routes(state: &AppState) -> Router<AppState> {
    use protected::videos;

    Router::new()
        .route("/getAll-videos", get(videos::list_videos))
        .route("/upload-video", post(videos::upload_video).layer(upload_limit(state)))
        .route(
            "/c/:videoId",
            get(videos::get_video)
                .patch(videos::update_video)
                .post(videos::toggle_publish)
                .delete(videos::delete_video),
        )
        .route(
            "/c/:videoId/video-file",
            patch(videos::replace_video_file).layer(upload_limit(state)),
        )
        .route(
            "/c/:videoId/thumbnail",
            patch(videos::replace_thumbnail).layer(upload_limit(state)),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}

fn comment_routes(state: &AppState) -> Router<AppState> {
    use protected::comments;

    // `:id` is a video id for POST/GET and a comment id for PATCH/DELETE
    Router::new()
        .route(
            "/c/:id",
            post(comments::add_comment)
                .get(comments::video_comments)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}

fn like_routes(state: &AppState) -> Router<AppState> {
    use protected::likes;

    Router::new()
        .route("/c/:videoId", post(likes::toggle_video_like))
        .route("/comment/:commentId", post(likes::toggle_comment_like))
        .route("/tweet/:tweetId", post(likes::toggle_tweet_like))
        .route("/likedVideos", get(likes::liked_videos))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}

fn tweet_routes(state: &AppState) -> Router<AppState> {
    use protected::tweets;

    Router::new()
        .route("/createTweet", post(tweets::create_tweet))
        .route("/c/:tweetId", patch(tweets::update_tweet).delete(tweets::delete_tweet))
        .route("/user/:userId", get(tweets::user_tweets))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}

fn playlist_routes(state: &AppState) -> Router<AppState> {
    use protected::playlists;

    Router::new()
        .route("/create-playlist", post(playlists::create_playlist))
        .route(
            "/c/:playlistId",
            get(playlists::get_playlist)
                .patch(playlists::update_playlist)
                .delete(playlists::delete_playlist),
        )
        .route("/c/:playlistId/videos", get(playlists::playlist_videos))
        .route("/add/:playlistId/:videoId", patch(playlists::add_video))
        .route("/remove/:playlistId/:videoId", patch(playlists::remove_video))
        .route("/user/:userId", get(playlists::user_playlists))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}

fn subscription_routes(state: &AppState) -> Router<AppState> {
    use protected::subscriptions;

    Router::new()
        .route(
            "/c/:channelId",
            get(subscriptions::channel_subscribers).post(subscriptions::toggle_subscription),
        )
        .route("/u/:subscriberId", get(subscriptions::subscribed_channels))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}

/// Credentialed CORS. `*` mirrors the caller's origin, since browsers refuse
/// a literal wildcard on credentialed responses.
fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = origin
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}

async fn root() -> ApiResult<Value> {
    let data = json!({
        "name": "VideoTube API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Video sharing backend: users, videos, comments, likes, tweets, playlists, subscriptions",
        "endpoints": {
            "health": "/health",
            "users": format!("{}/users", API_PREFIX),
            "videos": format!("{}/videos", API_PREFIX),
            "comments": format!("{}/comments", API_PREFIX),
            "likes": format!("{}/likes", API_PREFIX),
            "tweets": format!("{}/tweets", API_PREFIX),
            "playlists": format!("{}/playlists", API_PREFIX),
            "subscription": format!("{}/subscription", API_PREFIX),
        }
    });
    Ok(ApiResponse::ok(data, "VideoTube API"))
}

async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    let now = chrono::Utc::now();
    match state.db.health_check().await {
        Ok(()) => Ok(ApiResponse::ok(
            json!({ "status": "ok", "timestamp": now, "database": "ok" }),
            "Service is healthy",
        )),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Err(ApiError::service_unavailable("Database unavailable"))
        }
    }
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {} {} not found", method, uri.path()))
}
