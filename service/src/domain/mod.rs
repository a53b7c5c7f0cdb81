use serde::Deserialize;
use vrl_common::persistence::DocumentStore;

use crate::domain::{auth::TokenService, repository::PageRequest};

pub mod auth;
pub mod repository;

/// Page size rules for list endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Pagination {
    /// Missing values fall back to the first page and the default limit, out of
    /// range values are clamped. The page is capped so that the number of
    /// skipped documents still fits the store's signed 64 bit skip.
    pub fn request(&self, page: Option<u64>, limit: Option<u64>) -> PageRequest {
        let limit = limit
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1));
        let last_page = i64::MAX as u64 / limit;
        PageRequest {
            page: page.unwrap_or(1).clamp(1, last_page),
            limit,
        }
    }
}

//// The global application state shared between all request handlers.
pub trait AppState: Clone + Send + Sync + 'static {
    type S: DocumentStore;
    fn store(&self) -> &Self::S;
    fn tokens(&self) -> &TokenService;
    fn pagination(&self) -> &Pagination;
}
