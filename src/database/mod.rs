pub mod manager;
pub mod models;
pub mod paging;
pub mod pipeline;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use paging::{Page, Pagination, Sort, SortDirection};
pub use pipeline::{Lookup, Pipeline, Projection};
pub use repository::{Repository, Toggle};
