// handlers/protected/mod.rs - Handlers behind require_auth
//
// Every handler here takes a CurrentUser, which require_auth has attached to
// the request before the handler runs.

pub mod comments;
pub mod likes;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;
