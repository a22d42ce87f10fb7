//! Page arithmetic for the list view

/// Number of page links shown on each side of the current page
const WINDOW_RADIUS: u64 = 2;

/// Pagination figures for one list response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page, clamped to `1..=total_pages`
    pub page: u64,
    pub page_size: u64,
    pub total_records: u64,
    pub total_pages: u64,

    /// 1-based index of the first record on this page (0 when empty)
    pub start_record: u64,

    /// 1-based index of the last record on this page (0 when empty)
    pub end_record: u64,
}

/// One entry of the rendered page navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    Page(u64),
    Gap,
}

impl Pagination {
    /// Compute pagination; `page_size` of `None` puts every record on one page
    pub fn new(requested_page: u64, page_size: Option<u64>, total_records: u64) -> Self {
        let page_size = match page_size {
            Some(size) if size > 0 => size,
            _ => total_records.max(1),
        };
        let total_pages = total_records.div_ceil(page_size).max(1);
        let page = requested_page.clamp(1, total_pages);

        let (start_record, end_record) = if total_records == 0 {
            (0, 0)
        } else {
            let start = (page - 1) * page_size + 1;
            (start, (page * page_size).min(total_records))
        };

        Self {
            page,
            page_size,
            total_records,
            total_pages,
            start_record,
            end_record,
        }
    }

    /// Row offset of the current page
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// First page, last page and the pages within two of the current one,
    /// with gaps where pages are skipped
    pub fn window(&self) -> Vec<PageLink> {
        let low = self.page.saturating_sub(WINDOW_RADIUS).max(1);
        let high = (self.page + WINDOW_RADIUS).min(self.total_pages);
        let mut links = Vec::new();

        if low > 1 {
            links.push(PageLink::Page(1));
            if low > 2 {
                links.push(PageLink::Gap);
            }
        }
        links.extend((low..=high).map(PageLink::Page));
        if high < self.total_pages {
            if high < self.total_pages - 1 {
                links.push(PageLink::Gap);
            }
            links.push(PageLink::Page(self.total_pages));
        }

        links
    }
}
