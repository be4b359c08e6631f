// api/mod.rs - Response-side conversion of stored documents

pub mod format;
