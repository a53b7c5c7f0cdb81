use mongodb::bson::Document;
use serde::{Serialize, de::DeserializeOwned};
use vrl_common::{
    DocumentId, ID_FIELD_NAME,
    persistence::{StoreError, decode},
    validation::ValidationErrors,
};

pub mod entity;
pub mod singleton;
pub mod user;

pub use entity::EntityRepository;
pub use singleton::SingletonRepository;
pub use user::UserRepository;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RepositoryError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateKey(cause) => {
                tracing::debug!("duplicate key: {}", cause);
                Self::Conflict("a record with the same unique value already exists".to_owned())
            }
            other => Self::Store(other),
        }
    }
}

/// Validates a path identifier before it reaches the store.
pub fn parse_id(raw: &str) -> Result<DocumentId, RepositoryError> {
    DocumentId::parse(raw).map_err(|message| ValidationErrors::single("id", message).into())
}

pub(crate) fn empty_update() -> RepositoryError {
    ValidationErrors::single("body", "at least one field must be supplied").into()
}

/// Requested page, 1-based, with a limit already clamped to the allowed range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total.div_ceil(request.limit),
        }
    }
}

/// Decodes a page of documents. A document that no longer fits its type is
/// logged and left out instead of failing the whole page.
pub(crate) fn decode_all<T: DeserializeOwned>(collection: &str, documents: Vec<Document>) -> Vec<T> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document
                .get(ID_FIELD_NAME)
                .map(ToString::to_string)
                .unwrap_or_default();
            match decode(document) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!("skipping undecodable document {} in {}: {}", id, collection, e);
                    None
                }
            }
        })
        .collect()
}
