//! Orphan-aware pagination.
//!
//! `orphans` is the minimum item count folded into the last page rather
//! than spilling onto a new one: with 3 items per page and 1 orphan,
//! 4 items make one page of 4, not a page of 3 plus a page of 1.
//!
//! Page numbers are 1-based. Out-of-range or missing page numbers clamp
//! to the nearest valid page, so a stale link never errors.

use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: i64,
    per_page: u32,
    orphans: u32,
}

impl Paginator {
    pub fn new(count: i64, per_page: u32, orphans: u32) -> Self {
        // A zero page size would loop forever downstream; treat it as 1.
        let per_page = per_page.max(1);
        Self {
            count: count.max(0),
            per_page,
            orphans,
        }
    }

    pub fn num_pages(&self) -> u32 {
        let hits = (self.count - i64::from(self.orphans)).max(1);
        let per_page = i64::from(self.per_page);
        ((hits + per_page - 1) / per_page) as u32
    }

    /// Clamp a requested page number into `1..=num_pages`.
    pub fn clamp_page(&self, requested: Option<u32>) -> u32 {
        match requested {
            None | Some(0) => 1,
            Some(p) => p.min(self.num_pages()),
        }
    }

    /// SQL `LIMIT`/`OFFSET` for a (clamped) page. The last page's limit
    /// includes the orphan allowance so trailing items stay on it.
    pub fn limits(&self, page: u32) -> (i64, i64) {
        let offset = i64::from(page - 1) * i64::from(self.per_page);
        let limit = if page == self.num_pages() {
            i64::from(self.per_page) + i64::from(self.orphans)
        } else {
            i64::from(self.per_page)
        };
        (limit, offset)
    }

    pub fn meta(&self, page: u32) -> PageMeta {
        let num_pages = self.num_pages();
        PageMeta {
            page,
            num_pages,
            per_page: self.per_page,
            total: self.count,
            has_next: page < num_pages,
            has_previous: page > 1,
        }
    }
}

/// Pagination block included in every paginated response body.
#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub page: u32,
    pub num_pages: u32,
    pub per_page: u32,
    pub total: i64,
    pub has_next: bool,
    pub has_previous: bool,
}
