use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::domain::persistence::Filter;
use crate::domain::validation::{ValidationErrors, Validator, link, plain, text};

pub mod event;
pub mod home;
pub mod journal;
pub mod publication;
pub mod staff;
pub mod user;

pub const TITLE_MAX_LENGTH: usize = 300;
pub const NAME_MAX_LENGTH: usize = 100;
pub const SHORT_TEXT_MAX_LENGTH: usize = 200;

/// A collection backed entity with the usual create / read / partial update /
/// delete lifecycle.
///
/// `Input` is the untrusted request body, shared by create and update. Create
/// validation turns it into a `Draft` with every required field present, update
/// validation into a `Patch` holding only the supplied fields.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;
    /// used in messages, e.g. "Event not found"
    const NAME: &'static str;

    type Input: Serialize + DeserializeOwned + Default + Send + Sync + 'static;
    type Draft: Serialize + Send + Sync;
    type Patch: Serialize + Send + Sync;
    /// list query parameters understood by this entity
    type Query: Serialize + DeserializeOwned + Default + Send + Sync + 'static;

    fn validate_create(input: Self::Input) -> Result<Self::Draft, ValidationErrors>;

    fn validate_patch(input: Self::Input) -> Result<Self::Patch, ValidationErrors>;

    fn list_filter(_query: &Self::Query) -> Filter {
        Filter::new()
    }
}

/// A collection expected to hold exactly one live document.
pub trait Singleton: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;
    const NAME: &'static str;

    type Input: Serialize + DeserializeOwned + Default + Send + Sync + 'static;
    type Patch: Serialize + Send + Sync;

    fn validate_patch(input: Self::Input) -> Result<SingletonPatch<Self::Patch>, ValidationErrors>;
}

/// Validated singleton update. `expected_version` is the optimistic
/// concurrency token the caller read before editing, if it sent one.
#[derive(Clone, Debug, PartialEq)]
pub struct SingletonPatch<P> {
    pub fields: P,
    pub expected_version: Option<i64>,
}

/// List query for entities without filters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoFilter {}

/// Author details embedded by value in publications, events and articles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub photo: Option<String>,
}

impl AuthorInput {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_owned()),
            ..Self::default()
        }
    }

    pub fn validate(self) -> Result<Author, ValidationErrors> {
        let mut v = Validator::new();
        let name = v.required("name", self.name, text(NAME_MAX_LENGTH));
        let description = v
            .optional("description", self.description, plain)
            .unwrap_or_default();
        let photo = v.optional("photo", self.photo, link);
        match name {
            Some(name) => v.finish(Author {
                name,
                description,
                photo,
            }),
            None => Err(v.into_errors()),
        }
    }
}

/// Validates every author, reporting failures as `<field>[i].<name>`.
pub(crate) fn validate_authors(
    v: &mut Validator,
    field: &str,
    authors: Vec<AuthorInput>,
) -> Vec<Author> {
    let mut valid = Vec::with_capacity(authors.len());
    for (i, author) in authors.into_iter().enumerate() {
        match author.validate() {
            Ok(author) => valid.push(author),
            Err(errors) => v.nested(&format!("{field}[{i}]"), errors),
        }
    }
    valid
}
