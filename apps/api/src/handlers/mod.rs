//! Route handlers, one module per resource.
//!
//! Handlers stay thin: extract, `authorize`, call a repository, wrap the
//! result. Field rules live in tally-core and transactions in tally-db.

pub mod auth;
pub mod categories;
pub mod health;
pub mod products;
pub mod reports;
pub mod users;

use serde::Deserialize;
use tally_core::Page;

use crate::error::ApiResult;

/// `?page&limit` for paginated listings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn into_page(self) -> ApiResult<Page> {
        Ok(Page::new(self.page, self.limit)?)
    }
}
