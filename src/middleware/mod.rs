pub mod auth;
pub mod guard;
pub mod response;

pub use auth::{require_auth, CurrentUser, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
pub use guard::{parse_object_id, required, FieldSource, JsonBody, PathParam, Presence, Rule, Schema};
pub use response::{empty, ApiResponse, ApiResult};
