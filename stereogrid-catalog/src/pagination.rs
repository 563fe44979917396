//! Pagination utilities for the song list

/// Page size when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub page_size: i64,
    /// Total number of pages
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// Sanitize a raw `page_size` query value
///
/// Missing, unparsable, zero or negative values fall back to
/// [`DEFAULT_PAGE_SIZE`]; anything above [`MAX_PAGE_SIZE`] is clamped.
pub fn resolve_page_size(raw: Option<&str>) -> i64 {
    match raw.and_then(|s| s.trim().parse::<i64>().ok()) {
        Some(size) if size > 0 => size.min(MAX_PAGE_SIZE),
        _ => DEFAULT_PAGE_SIZE,
    }
}

/// Sanitize a raw `page` query value; anything unusable means page 1
pub fn resolve_page(raw: Option<&str>) -> i64 {
    match raw.and_then(|s| s.trim().parse::<i64>().ok()) {
        Some(page) if page > 0 => page,
        _ => 1,
    }
}

/// Calculate pagination metadata from total results and requested page
///
/// Ensures page is within valid bounds [1, total_pages]
///
/// # Examples
/// ```
/// use stereogrid_catalog::pagination::calculate_pagination;
///
/// // 25 total results at 10 per page = 3 pages (10 + 10 + 5)
/// let p = calculate_pagination(25, 2, 10);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 10);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(25, 99, 10);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 20);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64, page_size: i64) -> Pagination {
    let page_size = page_size.max(1);
    let total_pages = (total_results + page_size - 1) / page_size;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * page_size;

    Pagination {
        page,
        page_size,
        total_pages,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = calculate_pagination(250, 2, 100);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn test_pagination_first_page() {
        let p = calculate_pagination(15, 1, 10);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_out_of_bounds_high() {
        let p = calculate_pagination(15, 99, 10);
        assert_eq!(p.page, 2); // Clamped to last page
        assert_eq!(p.offset, 10);
    }

    #[test]
    fn test_pagination_out_of_bounds_low() {
        let p = calculate_pagination(15, 0, 10);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_empty() {
        let p = calculate_pagination(0, 1, 10);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_exact_page_boundary() {
        let p = calculate_pagination(20, 2, 10);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.offset, 10);
    }

    #[test]
    fn test_resolve_page_size() {
        assert_eq!(resolve_page_size(None), DEFAULT_PAGE_SIZE);
        assert_eq!(resolve_page_size(Some("25")), 25);
        assert_eq!(resolve_page_size(Some("100")), 100);
        assert_eq!(resolve_page_size(Some("101")), MAX_PAGE_SIZE);
        assert_eq!(resolve_page_size(Some("0")), DEFAULT_PAGE_SIZE);
        assert_eq!(resolve_page_size(Some("-5")), DEFAULT_PAGE_SIZE);
        assert_eq!(resolve_page_size(Some("lots")), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_resolve_page() {
        assert_eq!(resolve_page(None), 1);
        assert_eq!(resolve_page(Some("3")), 3);
        assert_eq!(resolve_page(Some("0")), 1);
        assert_eq!(resolve_page(Some("x")), 1);
    }
}
