use crate::error::error_model::{AppError, ErrorType};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct Message {
    #[schema(example = "Hello")]
    /// Message to display
    pub message: String,
    #[schema(example = "Success")]
    /// Status of the message
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Logout successful")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PaginationQuery {
    /// current page of the pagination
    #[serde(default = "default_page")]
    #[param(default = 1, example = 1)]
    pub page: i64,
    /// number of items per page, at most 100
    #[serde(default = "default_page_size")]
    #[param(default = 10, example = 10)]
    pub page_size: i64,
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

/// A resolved page: what to fetch and what to report back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub count: i64,
}

impl PageWindow {
    /// Resolves the requested page against `count` rows.
    ///
    /// Page sizes outside `1..=100` fall back to the default or the maximum. The first page
    /// always exists, even when there are no rows; any other page past the end is a 404.
    pub fn resolve(page: i64, page_size: i64, count: i64) -> Result<Self, AppError> {
        let page_size = if page_size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size.min(MAX_PAGE_SIZE)
        };
        let total_pages = ((count + page_size - 1) / page_size).max(1);
        if page < 1 || page > total_pages {
            return Err(AppError::new(ErrorType::NotFound, "Invalid page."));
        }
        Ok(Self {
            page,
            page_size,
            total_pages,
            count,
        })
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}
