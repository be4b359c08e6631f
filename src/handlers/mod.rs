// handlers/mod.rs - Route handlers, split by access tier
//
// public    - no authentication (register, login, token refresh)
// protected - require_auth has attached a CurrentUser
//
// Handlers stay thin: guard the request, call one service, wrap the result.

pub mod multipart;
pub mod protected;
pub mod public;

use std::path::Path;

use mongodb::bson::{oid::ObjectId, Document};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::api::format::documents_to_json;
use crate::app::AppState;
use crate::database::{Page, Pagination};
use crate::error::ApiError;
use crate::middleware::guard::{parse_object_id, PathParam, Schema};
use crate::services::{StagedFile, UploadedMedia};

/// Query string shared by the paginated listings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub query: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
    pub user_id: Option<String>,
}

impl ListParams {
    pub fn page(&self, state: &AppState) -> Page {
        Page::from_query(self.page.as_deref(), self.limit.as_deref(), &state.config.pagination)
    }
}

/// Guard a route's single path parameter and parse it as an id
pub fn path_id(schema: &Schema, name: &str, raw: &str) -> Result<ObjectId, ApiError> {
    schema.check(&PathParam(name, raw))?;
    parse_object_id(name, raw)
}

/// `{ <key>: items, pagination }`
pub fn paged(key: &str, items: Value, pagination: Pagination) -> Value {
    let mut body = Map::new();
    body.insert(key.to_string(), items);
    body.insert(
        "pagination".to_string(),
        serde_json::to_value(pagination).unwrap_or(Value::Null),
    );
    Value::Object(body)
}

pub fn paged_documents(key: &str, docs: Vec<Document>, pagination: Pagination) -> Value {
    paged(key, documents_to_json(docs), pagination)
}

/// Hand a staged file to the media store. The staged copy is deleted when
/// `file` drops at the end of this call, whatever the outcome.
pub async fn upload(state: &AppState, file: StagedFile) -> Result<UploadedMedia, ApiError> {
    let uploaded = state.media.upload(&file).await?;
    Ok(uploaded)
}

pub fn temp_dir(state: &AppState) -> &Path {
    Path::new(&state.config.media.temp_dir)
}
