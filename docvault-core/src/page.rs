//! Pagination parameters for multi-record queries.
//!
//! [`Pagination`] bounds a `find_many` result: `skip` documents are dropped first, then at most
//! `limit` are returned. Non-positive values passed to the constructors mean "unset".

use serde::{Deserialize, Serialize};

/// Skip and limit applied to a multi-record query.
///
/// # Example
///
/// ```ignore
/// use docvault::page::Pagination;
///
/// // No skip, at most 10 records
/// let page = Pagination::new(-1, 10);
/// assert_eq!(page.skip, None);
/// assert_eq!(page.limit, Some(10));
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Number of matching documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return.
    pub limit: Option<u64>,
}

impl Pagination {
    /// Creates pagination parameters; values `<= 0` are treated as unset.
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip: positive(skip),
            limit: positive(limit),
        }
    }

    /// Returns parameters that apply neither skip nor limit.
    pub fn all() -> Self {
        Self::default()
    }

    /// Sets the number of documents to skip; values `<= 0` clear it.
    pub fn with_skip(mut self, skip: i64) -> Self {
        self.skip = positive(skip);
        self
    }

    /// Sets the maximum number of documents; values `<= 0` clear it.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = positive(limit);
        self
    }

    /// Applies skip then limit to `items`.
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let skip = self.skip.map_or(0, |skip| usize::try_from(skip).unwrap_or(usize::MAX));
        let limit = self.limit.map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));

        items.into_iter().skip(skip).take(limit).collect()
    }
}

fn positive(value: i64) -> Option<u64> {
    u64::try_from(value).ok().filter(|value| *value > 0)
}
