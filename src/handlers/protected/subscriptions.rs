// handlers/protected/subscriptions.rs - /subscription routes

use axum::extract::{Path, Query, State};
use serde_json::Value;

use crate::api::format::model_to_json;
use crate::app::AppState;
use crate::database::Toggle;
use crate::handlers::{paged_documents, path_id, ListParams};
use crate::middleware::guard::{required, Schema};
use crate::middleware::{empty, ApiResponse, ApiResult, CurrentUser};
use crate::services::SubscriptionService;

const CHANNEL_ID: Schema = Schema::new(&[required("channelId", "Channel id is required")]);
const SUBSCRIBER_ID: Schema = Schema::new(&[required("subscriberId", "Subscriber id is required")]);

/// GET /c/:channelId
pub async fn channel_subscribers(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(channel_id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Value> {
    let channel_id = path_id(&CHANNEL_ID, "channelId", &channel_id)?;
    let (subscribers, pagination) = SubscriptionService::new(state.db.clone())
        .subscribers(channel_id, &params.page(&state))
        .await?;

    let total = pagination.total;
    let mut data = paged_documents("subscribers", subscribers, pagination);
    if let Value::Object(body) = &mut data {
        body.insert("subscriberCount".to_string(), Value::from(total));
    }
    Ok(ApiResponse::ok(data, "Subscribers fetched successfully"))
}

/// POST /c/:channelId
pub async fn toggle_subscription(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(channel_id): Path<String>,
) -> ApiResult<Value> {
    let channel_id = path_id(&CHANNEL_ID, "channelId", &channel_id)?;
    match SubscriptionService::new(state.db.clone())
        .toggle(channel_id, user.id()?)
        .await?
    {
        Toggle::Added(subscription) => Ok(ApiResponse::ok(
            model_to_json(&subscription)?,
            "The channel subscribed successfully",
        )),
        Toggle::Removed => Ok(ApiResponse::ok(empty(), "The channel unsubscribed successfully")),
    }
}

/// GET /u/:subscriberId
pub async fn subscribed_channels(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(subscriber_id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Value> {
    let subscriber_id = path_id(&SUBSCRIBER_ID, "subscriberId", &subscriber_id)?;
    let (channels, pagination) = SubscriptionService::new(state.db.clone())
        .subscribed_channels(subscriber_id, &params.page(&state))
        .await?;
    Ok(ApiResponse::ok(
        paged_documents("channels", channels, pagination),
        "Subscribed channels fetched successfully",
    ))
}
