// handlers/protected/tweets.rs - /tweets routes

use axum::extract::{Path, Query, State};
use serde_json::Value;

use crate::api::format::model_to_json;
use crate::app::AppState;
use crate::handlers::{paged_documents, path_id, ListParams};
use crate::middleware::guard::{parse_object_id, required, text, JsonBody, PathParam, Schema};
use crate::middleware::{empty, ApiResponse, ApiResult, CurrentUser};
use crate::services::TweetService;

const CREATE: Schema = Schema::new(&[required("content", "Tweet is required")]);

const UPDATE: Schema = Schema::new(&[
    required("tweetId", "Tweet id is required"),
    required("content", "Tweet is required"),
]);

const TWEET_ID: Schema = Schema::new(&[required("tweetId", "Tweet id is required")]);
const USER_ID: Schema = Schema::new(&[required("userId", "User id is required")]);

pub async fn create_tweet(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Value> {
    CREATE.check(&body)?;
    let tweet = TweetService::new(state.db.clone())
        .create(user.id()?, text(&body, "content").unwrap_or_default())
        .await?;
    Ok(ApiResponse::ok(model_to_json(&tweet)?, "Tweet created successfully"))
}

pub async fn update_tweet(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(tweet_id): Path<String>,
    JsonBody(body): JsonBody,
) -> ApiResult<Value> {
    UPDATE.check(&(PathParam("tweetId", &tweet_id), &body))?;
    let tweet_id = parse_object_id("tweetId", &tweet_id)?;

    let tweet = TweetService::new(state.db.clone())
        .update(tweet_id, user.id()?, text(&body, "content").unwrap_or_default())
        .await?;
    Ok(ApiResponse::ok(model_to_json(&tweet)?, "Tweet updated successfully"))
}

pub async fn delete_tweet(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(tweet_id): Path<String>,
) -> ApiResult<Value> {
    let tweet_id = path_id(&TWEET_ID, "tweetId", &tweet_id)?;
    TweetService::new(state.db.clone()).delete(tweet_id, user.id()?).await?;
    Ok(ApiResponse::ok(empty(), "Tweet deleted successfully"))
}

/// GET /user/:userId - newest first, with like counts
pub async fn user_tweets(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Value> {
    let user_id = path_id(&USER_ID, "userId", &user_id)?;
    let (tweets, pagination) = TweetService::new(state.db.clone())
        .by_user(user_id, user.id()?, &params.page(&state))
        .await?;
    Ok(ApiResponse::ok(
        paged_documents("tweets", tweets, pagination),
        "Tweets fetched successfully",
    ))
}
