use serde::{Deserialize, Serialize};

use crate::config::SchedulingConfig;

/// One-based page selector as received from callers; missing values fall back to configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// Resolve to a concrete `(page, limit)` pair, clamping the limit to the configured ceiling.
    pub fn resolve(self, config: &SchedulingConfig) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size);
        (page, limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    /// Slice an already ordered result set.
    pub fn slice(items: Vec<T>, request: PageRequest, config: &SchedulingConfig) -> Self {
        let (page, limit) = request.resolve(config);
        let total = items.len();
        let skip = (page as usize - 1).saturating_mul(limit as usize);
        let items = items.into_iter().skip(skip).take(limit as usize).collect();

        Self {
            items,
            total,
            page,
            limit,
        }
    }
}
