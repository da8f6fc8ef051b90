use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::validator::{Validator, permitted_value};

pub const MAX_PAGE: i64 = 10_000_000;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Sort keys accepted by the movie listing, ascending and descending.
pub const MOVIE_SORT_SAFELIST: &[&str] = &[
    "id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime",
];

/// A sort value outside the safelist got past validation. This is a bug in
/// the caller, never a user error.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsafe sort parameter: {0}")]
pub struct UnsafeSortError(pub String);

/// Page or page size outside `1..=MAX_PAGE` and `1..=MAX_PAGE_SIZE` got
/// past validation. Like [`UnsafeSortError`], a caller bug.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsafe paging parameters: page {page}, page_size {page_size}")]
pub struct UnsafePagingError {
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Paging and sort parameters for a list query.
///
/// The sort column and direction are the only values ever spliced into SQL
/// text, so both come out of `sort_safelist` rather than from `sort` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
    pub sort_safelist: &'static [&'static str],
}

impl Filters {
    /// First page, 20 per page, sorted by id.
    pub fn new(sort_safelist: &'static [&'static str]) -> Self {
        Self {
            page: 1,
            page_size: 20,
            sort: "id".to_string(),
            sort_safelist,
        }
    }

    /// The safelisted column named by `sort`, with any `-` prefix removed.
    pub fn sort_column(&self) -> Result<&'static str, UnsafeSortError> {
        self.sort_safelist
            .iter()
            .copied()
            .find(|safe| *safe == self.sort)
            .map(|safe| safe.trim_start_matches('-'))
            .ok_or_else(|| UnsafeSortError(self.sort.clone()))
    }

    pub fn sort_direction(&self) -> SortDirection {
        if self.sort.starts_with('-') {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// `(limit, offset)` for a query, provided page and page size are within
    /// the bounds `validate_filters` enforces.
    pub fn paging(&self) -> Result<(i64, i64), UnsafePagingError> {
        if (1..=MAX_PAGE).contains(&self.page) && (1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            Ok((self.limit(), self.offset()))
        } else {
            Err(UnsafePagingError {
                page: self.page,
                page_size: self.page_size,
            })
        }
    }
}

pub fn validate_filters(v: &mut Validator, f: &Filters) {
    v.check(f.page >= 1, "page", "must be greater than zero");
    v.check(f.page <= MAX_PAGE, "page", "must be a maximum of 10 million");
    v.check(f.page_size >= 1, "page_size", "must be greater than zero");
    v.check(f.page_size <= MAX_PAGE_SIZE, "page_size", "must be a maximum of 100");
    v.check(permitted_value(f.sort.as_str(), f.sort_safelist), "sort", "invalid sort value");
}

/// Pagination details returned alongside a page of results. All zero when
/// nothing matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_records: i64,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

pub fn calculate_metadata(total_records: i64, page: i64, page_size: i64) -> Metadata {
    if total_records == 0 || page_size <= 0 {
        return Metadata::default();
    }

    Metadata {
        current_page: page,
        page_size,
        first_page: 1,
        last_page: (total_records + page_size - 1) / page_size,
        total_records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(page: i64, page_size: i64, sort: &str) -> Filters {
        Filters {
            page,
            page_size,
            sort: sort.to_string(),
            sort_safelist: MOVIE_SORT_SAFELIST,
        }
    }

    #[test]
    fn descending_sort_resolves() {
        let f = filters(1, 20, "-year");
        assert_eq!(f.sort_column(), Ok("year"));
        assert_eq!(f.sort_direction(), SortDirection::Desc);
        assert_eq!(f.sort_direction().as_sql(), "DESC");
    }

    #[test]
    fn ascending_sort_resolves() {
        let f = filters(1, 20, "title");
        assert_eq!(f.sort_column(), Ok("title"));
        assert_eq!(f.sort_direction(), SortDirection::Asc);
    }

    #[test]
    fn unlisted_sort_never_resolves() {
        for sort in ["created_at", "year DESC; DROP TABLE movies", "--year", "YEAR", ""] {
            let f = filters(1, 20, sort);
            assert_eq!(f.sort_column(), Err(UnsafeSortError(sort.to_string())));

            let mut v = Validator::new();
            validate_filters(&mut v, &f);
            assert_eq!(v.error("sort"), Some("invalid sort value"));
        }
    }

    #[test]
    fn limit_and_offset() {
        let f = filters(3, 25, "id");
        assert_eq!(f.limit(), 25);
        assert_eq!(f.offset(), 50);
        assert_eq!(filters(1, 10, "id").offset(), 0);
        assert_eq!(filters(i64::MAX, MAX_PAGE_SIZE, "id").offset(), i64::MAX);
        assert_eq!(filters(i64::MIN, 10, "id").offset(), i64::MIN);
    }

    #[test]
    fn paging_within_bounds_resolves() {
        assert_eq!(filters(3, 25, "id").paging(), Ok((25, 50)));
        assert_eq!(
            filters(MAX_PAGE, MAX_PAGE_SIZE, "id").paging(),
            Ok((MAX_PAGE_SIZE, (MAX_PAGE - 1) * MAX_PAGE_SIZE))
        );
    }

    #[test]
    fn paging_out_of_bounds_never_resolves() {
        for (page, page_size) in [
            (1, -1),
            (1, 0),
            (1, MAX_PAGE_SIZE + 1),
            (0, 20),
            (-5, 20),
            (MAX_PAGE + 1, 20),
            (i64::MAX, MAX_PAGE_SIZE),
        ] {
            assert_eq!(
                filters(page, page_size, "id").paging(),
                Err(UnsafePagingError { page, page_size }),
                "page {page}, page_size {page_size}"
            );
        }
    }

    #[test]
    fn page_bounds() {
        let mut v = Validator::new();
        validate_filters(&mut v, &filters(1, 1, "id"));
        assert!(v.valid());

        let mut v = Validator::new();
        validate_filters(&mut v, &filters(MAX_PAGE, MAX_PAGE_SIZE, "-runtime"));
        assert!(v.valid());

        let mut v = Validator::new();
        validate_filters(&mut v, &filters(0, 0, "id"));
        assert!(v.error("page").is_some());
        assert!(v.error("page_size").is_some());

        let mut v = Validator::new();
        validate_filters(&mut v, &filters(MAX_PAGE + 1, MAX_PAGE_SIZE + 1, "id"));
        assert!(v.error("page").is_some());
        assert!(v.error("page_size").is_some());
        assert!(v.error("sort").is_none());
    }

    #[test]
    fn metadata_empty_when_nothing_matched() {
        assert_eq!(calculate_metadata(0, 2, 20), Metadata::default());
        assert_eq!(serde_json::to_value(Metadata::default()).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn metadata_rounds_last_page_up() {
        assert_eq!(
            calculate_metadata(195, 2, 20),
            Metadata {
                current_page: 2,
                page_size: 20,
                first_page: 1,
                last_page: 10,
                total_records: 195,
            }
        );
        assert_eq!(calculate_metadata(200, 1, 20).last_page, 10);
        assert_eq!(calculate_metadata(1, 1, 100).last_page, 1);
    }
}
