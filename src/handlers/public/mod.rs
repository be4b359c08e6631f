// handlers/public/mod.rs - Endpoints reachable without an access token

pub mod users;

pub use users::{login, refresh_token, register};
