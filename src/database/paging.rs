use mongodb::bson::{doc, Document};
use serde::Serialize;

use crate::config::PaginationConfig;

/// Largest skip or limit MongoDB accepts
const MAX_OFFSET: u64 = i64::MAX as u64;

/// A requested page window. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    /// Parse `page` / `limit` query values. Anything unparsable or zero falls
    /// back to the defaults, and `limit` is clamped to the configured maximum.
    /// `page` is clamped so that the skip count fits in an `i64`.
    pub fn from_query(page: Option<&str>, limit: Option<&str>, config: &PaginationConfig) -> Self {
        let limit = limit
            .and_then(|l| l.trim().parse::<u64>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(config.default_limit)
            .min(config.max_limit)
            .clamp(1, MAX_OFFSET);
        let page = page
            .and_then(|p| p.trim().parse::<u64>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1)
            .min(MAX_OFFSET / limit + 1);

        Self { page, limit }
    }

    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit).min(MAX_OFFSET)
    }

    /// Skip count as the driver and `$skip` expect it
    pub fn offset(&self) -> i64 {
        i64::try_from(self.skip()).unwrap_or(i64::MAX)
    }

    /// Page size as the driver and `$limit` expect it
    pub fn size(&self) -> i64 {
        i64::try_from(self.limit).unwrap_or(i64::MAX)
    }
}

/// Pagination metadata returned next to a page of items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(total: u64, page: &Page) -> Self {
        Self {
            total,
            page: page.page,
            limit: page.limit,
            total_pages: total.div_ceil(page.limit.max(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "asc" | "ascending" => Some(SortDirection::Asc),
            "-1" | "desc" | "descending" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub const DEFAULT_FIELD: &'static str = "createdAt";

    /// Newest first
    pub fn newest() -> Self {
        Self {
            field: Self::DEFAULT_FIELD.to_string(),
            direction: SortDirection::Desc,
        }
    }

    /// Parse `sortBy` / `sortType`. Fields outside `allowed` and unknown
    /// directions fall back to `createdAt` descending.
    pub fn from_query(sort_by: Option<&str>, sort_type: Option<&str>, allowed: &[&str]) -> Self {
        let field = sort_by
            .map(str::trim)
            .filter(|f| allowed.contains(f))
            .unwrap_or(Self::DEFAULT_FIELD)
            .to_string();
        let direction = sort_type
            .and_then(SortDirection::parse)
            .unwrap_or(SortDirection::Desc);

        Self { field, direction }
    }

    /// Sort document; ties are broken by `_id` so pages are stable.
    pub fn to_document(&self) -> Document {
        let mut sort = Document::new();
        sort.insert(self.field.clone(), self.direction.as_i32());
        if self.field != "_id" {
            sort.insert("_id", self.direction.as_i32());
        }
        sort
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::newest()
    }
}

/// Sort applied to join rows (likes, subscriptions) listed newest first
pub fn newest_first() -> Document {
    doc! { "createdAt": -1, "_id": -1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PaginationConfig {
        PaginationConfig { default_limit: 10, max_limit: 50 }
    }

    #[test]
    fn page_defaults_and_clamps() {
        let cfg = config();
        assert_eq!(Page::from_query(None, None, &cfg), Page { page: 1, limit: 10 });
        assert_eq!(Page::from_query(Some("0"), Some("0"), &cfg), Page { page: 1, limit: 10 });
        assert_eq!(Page::from_query(Some("abc"), Some("-5"), &cfg), Page { page: 1, limit: 10 });
        assert_eq!(Page::from_query(Some("3"), Some("500"), &cfg), Page { page: 3, limit: 50 });
        assert_eq!(Page::from_query(Some("3"), Some("20"), &cfg).skip(), 40);
    }

    #[test]
    fn huge_page_keeps_skip_in_range() {
        let cfg = config();
        let page = Page::from_query(Some("1000000000000000000"), Some("10"), &cfg);
        assert_eq!(page.limit, 10);
        assert!(page.offset() >= 0);
        assert!(page.skip() <= i64::MAX as u64);

        let page = Page::from_query(Some("18446744073709551615"), Some("50"), &cfg);
        assert!(page.offset() >= 0);

        let stages = crate::database::Pipeline::new().paginate(&page).into_stages();
        assert!(stages[0].get_i64("$skip").unwrap() >= 0);
        assert_eq!(stages[1].get_i64("$limit").unwrap(), 50);
    }

    #[test]
    fn total_pages_is_ceiling() {
        let page = Page { page: 1, limit: 10 };
        assert_eq!(Pagination::new(0, &page).total_pages, 0);
        assert_eq!(Pagination::new(1, &page).total_pages, 1);
        assert_eq!(Pagination::new(10, &page).total_pages, 1);
        assert_eq!(Pagination::new(11, &page).total_pages, 2);
        assert_eq!(Pagination::new(95, &Page { page: 2, limit: 7 }).total_pages, 14);
    }

    #[test]
    fn pagination_serializes_camel_case() {
        let value = serde_json::to_value(Pagination::new(25, &Page { page: 2, limit: 10 })).unwrap();
        assert_eq!(value["totalPages"], 3);
        assert_eq!(value["page"], 2);
    }

    #[test]
    fn sort_respects_allow_list() {
        let allowed = ["createdAt", "views", "duration"];
        let sort = Sort::from_query(Some("views"), Some("asc"), &allowed);
        assert_eq!(sort.to_document(), doc! { "views": 1, "_id": 1 });

        let sort = Sort::from_query(Some("password"), Some("1"), &allowed);
        assert_eq!(sort.field, "createdAt");
        assert_eq!(sort.direction, SortDirection::Asc);

        let sort = Sort::from_query(None, Some("sideways"), &allowed);
        assert_eq!(sort, Sort::newest());
    }
}
