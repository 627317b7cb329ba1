//! Uniform page contract for every list operation.
//!
//! Pages are 1-based and sized per list kind; the caller only picks the page
//! number. Anything below 1 is read as 1.

use serde::{Serialize, Serializer};
use serde::ser::SerializeStruct;

/// Which kind of list is being paged. Fixes the page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Recipe lists: feed, latest, favorites, recipes of a user, search.
    Recipes,
    /// People lists: followers, following, likers, user search.
    People,
}

impl PageKind {
    pub const fn page_size(self) -> usize {
        match self {
            PageKind::Recipes => 7,
            PageKind::People => 10,
        }
    }
}

/// A normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    kind: PageKind,
}

impl PageRequest {
    pub fn new(page: i64, kind: PageKind) -> Self {
        let page = if page < 1 { 1 } else { page as usize };
        Self { page, kind }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn limit(&self) -> usize {
        self.kind.page_size()
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit())
    }

    /// `ceil(total / page_size)`, never less than 1.
    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.limit()).max(1)
    }
}

/// One slice of an ordered result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, request: PageRequest, total: usize) -> Self {
        Self {
            records,
            page: request.page(),
            total_pages: request.total_pages(total),
        }
    }

    /// An empty result: no records, a single (empty) page.
    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }
}

impl<T: Serialize> Serialize for Page<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Page", 4)?;
        s.serialize_field("records", &self.records)?;
        s.serialize_field("page", &self.page)?;
        s.serialize_field("total_pages", &self.total_pages)?;
        s.serialize_field("has_next_page", &self.has_next_page())?;
        s.end()
    }
}
