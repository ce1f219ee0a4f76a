//! This modules defines the common functionality for paging data.

use serde::Serialize;

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of items per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a client may request.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// The 1-based page number.
    pub page: u64,
    /// The number of items per page.
    pub per_page: u64,
}

impl PageRequest {
    /// The number of rows to skip in a query.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.per_page
    }
}

impl PaginationConfig {
    /// Fill in missing query parameters with the defaults and clamp them to valid values.
    pub fn page_request(&self, page: Option<u64>, per_page: Option<u64>) -> PageRequest {
        let page = page.unwrap_or(self.default_page).max(1);
        let per_page = per_page
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);

        PageRequest { page, per_page }
    }
}

/// A page of items along with the information needed to fetch the other pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    /// The items on the current page.
    pub items: Vec<T>,
    /// The current page number.
    pub page: u64,
    /// The maximum number of items per page.
    pub per_page: u64,
    /// The number of items across all pages.
    pub total_items: u64,
    /// The number of pages.
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    /// Wrap `items` fetched for `request` out of `total_items`.
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total_items,
            total_pages: total_items.div_ceil(request.per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::pagination::{PageRequest, Paginated, PaginationConfig};

    #[test]
    fn uses_defaults_for_missing_values() {
        let config = PaginationConfig::default();

        let got = config.page_request(None, None);

        assert_eq!(
            got,
            PageRequest {
                page: 1,
                per_page: 20
            }
        );
    }

    #[test]
    fn clamps_page_size() {
        let config = PaginationConfig::default();

        assert_eq!(config.page_request(Some(0), Some(1000)).per_page, 100);
        assert_eq!(config.page_request(Some(0), Some(0)).per_page, 1);
        assert_eq!(config.page_request(Some(0), None).page, 1);
    }

    #[test]
    fn computes_offset() {
        let request = PageRequest {
            page: 3,
            per_page: 20,
        };

        assert_eq!(request.offset(), 40);
    }

    #[test]
    fn counts_partial_last_page() {
        let request = PageRequest {
            page: 1,
            per_page: 20,
        };

        let page = Paginated::new(vec![1, 2, 3], request, 41);

        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn no_items_means_no_pages() {
        let request = PageRequest {
            page: 1,
            per_page: 20,
        };

        let page: Paginated<i32> = Paginated::new(vec![], request, 0);

        assert_eq!(page.total_pages, 0);
    }
}
