//! Limit/offset paging for member listings

use serde::Serialize;

/// Upper bound on rows returned by any listing
pub const MAX_LIMIT: i64 = 1000;

/// Default page size for the tier-filtered member listing
pub const MEMBER_PAGE_SIZE: i64 = 100;

/// Default page size for the per-department member listing
pub const DEPARTMENT_PAGE_SIZE: i64 = 1000;

/// Default length of the priority ranking
pub const PRIORITY_LIMIT: i64 = 10;

/// Sanitized limit and offset for a SQL `LIMIT ? OFFSET ?` clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub limit: i64,
    pub offset: i64,
}

impl Paging {
    /// Clamp requested values
    ///
    /// A missing limit takes `default_limit`; any limit is clamped to
    /// `1..=MAX_LIMIT`. A missing or negative offset becomes 0.
    ///
    /// # Examples
    /// ```
    /// use carerisk_engine::pagination::Paging;
    ///
    /// let p = Paging::new(Some(5000), Some(-3), 100);
    /// assert_eq!(p.limit, 1000);
    /// assert_eq!(p.offset, 0);
    /// ```
    pub fn new(limit: Option<i64>, offset: Option<i64>, default_limit: i64) -> Self {
        Self {
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

/// One page of rows plus the paging that produced it
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub limit: i64,
    pub offset: i64,
    /// Rows on this page, not the size of the full result set
    pub count: usize,
    pub rows: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(paging: Paging, rows: Vec<T>) -> Self {
        Self {
            limit: paging.limit,
            offset: paging.offset,
            count: rows.len(),
            rows,
        }
    }
}
