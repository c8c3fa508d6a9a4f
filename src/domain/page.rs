//! Offset pagination for list operations.

use super::validate::InvalidInput;

pub const DEFAULT_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Page {
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Page {
    /// Build a page from optional request values, bounded by `max_limit`.
    pub fn new(skip: Option<i64>, limit: Option<i64>, max_limit: i64) -> Result<Self, InvalidInput> {
        let skip = skip.unwrap_or(0);
        if skip < 0 {
            return Err(InvalidInput::new("skip", "must not be negative"));
        }
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT.min(max_limit));
        if limit < 1 || limit > max_limit {
            return Err(InvalidInput::new(
                "limit",
                format!("must be between 1 and {}", max_limit),
            ));
        }
        Ok(Page { skip, limit })
    }
}
