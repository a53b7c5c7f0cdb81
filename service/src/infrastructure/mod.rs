use std::sync::Arc;

use vrl_common::persistence::DocumentStore;

use crate::domain::{AppState, Pagination, auth::TokenService};

pub mod http;
pub mod settings;

#[derive(Clone)]
pub struct AppStateImpl<S> {
    store: S,
    tokens: Arc<TokenService>,
    pagination: Pagination,
}

impl<S: DocumentStore> AppStateImpl<S> {
    pub fn new(store: S, tokens: TokenService, pagination: Pagination) -> Self {
        Self {
            store,
            tokens: Arc::new(tokens),
            pagination,
        }
    }
}

impl<S: DocumentStore> AppState for AppStateImpl<S> {
    type S = S;

    fn store(&self) -> &Self::S {
        &self.store
    }

    fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    fn pagination(&self) -> &Pagination {
        &self.pagination
    }
}
