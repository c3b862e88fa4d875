//! Result envelopes returned to callers of a compiled query.

use serde::{Deserialize, Serialize};

/// Page size used when a query does not set `take`.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Total matching rows plus the requested page of items.
///
/// `items` is `None` in count-only mode and omitted from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionResult<T> {
    /// Number of rows matching the filters, ignoring pagination.
    pub total: u64,
    /// The paginated slice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<T>>,
}

impl<T> CollectionResult<T> {
    /// A result carrying rows.
    pub fn new(total: u64, items: Vec<T>) -> Self {
        Self {
            total,
            items: Some(items),
        }
    }

    /// A count-only result.
    pub fn count_only(total: u64) -> Self {
        Self { total, items: None }
    }

    /// Rows of this page, empty in count-only mode.
    pub fn items(&self) -> &[T] {
        self.items.as_deref().unwrap_or(&[])
    }

    /// Transform every item.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> CollectionResult<U> {
        CollectionResult {
            total: self.total,
            items: self.items.map(|items| items.into_iter().map(f).collect()),
        }
    }
}

/// Page metadata derived from `{total, take, skip}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// 1-based page number.
    pub page: u64,
    /// Rows per page.
    pub page_size: u64,
    /// Number of pages, 0 when nothing matched.
    pub total_pages: u64,
}

impl PageInfo {
    /// Derive page metadata.
    ///
    /// A missing or zero `take` falls back to [`DEFAULT_PAGE_SIZE`].
    pub fn new(total: u64, take: Option<u64>, skip: Option<u64>) -> Self {
        let page_size = take.filter(|t| *t > 0).unwrap_or(DEFAULT_PAGE_SIZE);
        if total == 0 {
            return Self {
                page: 1,
                page_size,
                total_pages: 0,
            };
        }
        Self {
            page: skip.unwrap_or(0) / page_size + 1,
            page_size,
            total_pages: total.div_ceil(page_size),
        }
    }
}

/// A collection result with page metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Number of rows matching the filters.
    pub total: u64,
    /// Rows of this page.
    pub data: Vec<T>,
    /// Page metadata.
    #[serde(flatten)]
    pub info: PageInfo,
}

impl<T> Page<T> {
    /// Attach page metadata to a result.
    pub fn from_result(result: CollectionResult<T>, take: Option<u64>, skip: Option<u64>) -> Self {
        let info = PageInfo::new(result.total, take, skip);
        Self {
            total: result.total,
            data: result.items.unwrap_or_default(),
            info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_info() {
        let info = PageInfo::new(95, Some(10), Some(20));
        assert_eq!(info.page, 3);
        assert_eq!(info.page_size, 10);
        assert_eq!(info.total_pages, 10);
    }

    #[test]
    fn test_page_info_empty() {
        let info = PageInfo::new(0, Some(10), Some(40));
        assert_eq!(info.page, 1);
        assert_eq!(info.total_pages, 0);
    }

    #[test]
    fn test_page_info_defaults() {
        let info = PageInfo::new(21, None, None);
        assert_eq!(info.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(info.page, 1);
        assert_eq!(info.total_pages, 3);

        let info = PageInfo::new(21, Some(0), Some(15));
        assert_eq!(info.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(info.page, 2);
    }

    #[test]
    fn test_count_only_omits_items() {
        let result: CollectionResult<u32> = CollectionResult::count_only(7);
        assert!(result.items().is_empty());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({"total": 7})
        );

        let result = CollectionResult::new(2, vec![1, 2]).map(|n| n * 10);
        assert_eq!(result.items(), &[10, 20]);
    }

    #[test]
    fn test_page_serialization() {
        let page = Page::from_result(CollectionResult::new(95, vec!["a"]), Some(10), Some(20));
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            serde_json::json!({
                "total": 95,
                "data": ["a"],
                "page": 3,
                "page_size": 10,
                "total_pages": 10
            })
        );
    }
}
