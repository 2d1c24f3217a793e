//! Project-specific utilities live here.

use serde::Serialize;

/// Paging metadata returned next to every listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(u64::from(limit.max(1)));
        Self {
            current_page: page,
            total_pages,
            total_items,
            has_next: u64::from(page) < total_pages,
            has_prev: page > 1,
        }
    }
}

/// One page of an ordered listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Slice an already ordered listing down to one page (1-based)
pub fn paginate<T>(items: Vec<T>, page: u32, limit: u32) -> Page<T> {
    let pagination = Pagination::new(page, limit, items.len() as u64);
    let skip = (page.saturating_sub(1) as usize).saturating_mul(limit as usize);
    Page {
        items: items.into_iter().skip(skip).take(limit as usize).collect(),
        pagination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page() {
        let page = paginate((1..=25).collect(), 2, 10);
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.pagination.total_pages, 3);
        assert!(page.pagination.has_next);
        assert!(page.pagination.has_prev);
    }

    #[test]
    fn last_partial_page() {
        let page = paginate((1..=25).collect(), 3, 10);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert!(!page.pagination.has_next);
    }

    #[test]
    fn empty_listing() {
        let page = paginate(Vec::<u8>::new(), 1, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.total_pages, 0);
        assert!(!page.pagination.has_next);
        assert!(!page.pagination.has_prev);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page = paginate((1..=5).collect::<Vec<u8>>(), 4, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.total_items, 5);
    }
}
