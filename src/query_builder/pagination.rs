use serde::{Deserialize, Serialize};

/// LIMIT/OFFSET stage of a prepared task query
///
/// The data manager pages its grid with `page`/`page_size` request
/// parameters; both map onto plain LIMIT/OFFSET here so pagination composes
/// with an already-built query instead of re-running the build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Pagination {
    /// Create pagination from a 1-indexed page number and page size
    pub fn new(page: u32, page_size: u32) -> Self {
        let offset = if page > 0 {
            Some((page - 1) * page_size)
        } else {
            None
        };
        Self {
            limit: Some(page_size),
            offset,
        }
    }

    /// Create pagination with only a row cap
    pub fn limit_only(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
        }
    }

    /// Create pagination with both limit and offset
    pub fn limit_offset(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    /// Convert to SQL string
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        sql
    }

    /// Total grid pages for a given task count
    pub fn total_pages(&self, total_count: u32) -> u32 {
        if let Some(limit) = self.limit {
            total_count.div_ceil(limit)
        } else {
            1
        }
    }

    /// Current page number (1-indexed)
    pub fn current_page(&self) -> u32 {
        if let (Some(limit), Some(offset)) = (self.limit, self.offset) {
            (offset / limit) + 1
        } else {
            1
        }
    }

    /// Whether another page of tasks follows this one
    pub fn has_next_page(&self, total_count: u32) -> bool {
        if let (Some(limit), Some(offset)) = (self.limit, self.offset) {
            offset + limit < total_count
        } else {
            false
        }
    }
}
