use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DocumentId;
use crate::domain::entities::{
    Author, AuthorInput, Entity, SHORT_TEXT_MAX_LENGTH, TITLE_MAX_LENGTH, validate_authors,
};
use crate::domain::persistence::Filter;
use crate::domain::validation::{ValidationErrors, Validator, link, nullable, text};

pub const PUBLICATIONS_COLLECTION: &str = "publications";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub title: String,
    pub document_url: String,
    pub category: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationInput {
    pub title: Option<String>,
    pub document_url: Option<String>,
    pub category: Option<String>,
    pub authors: Option<Vec<AuthorInput>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPublication {
    pub title: String,
    pub document_url: String,
    pub category: String,
    pub authors: Vec<Author>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<Author>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Option<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationQuery {
    pub category: Option<String>,
}

impl Entity for Publication {
    const COLLECTION: &'static str = PUBLICATIONS_COLLECTION;
    const NAME: &'static str = "Publication";

    type Input = PublicationInput;
    type Draft = NewPublication;
    type Patch = PublicationPatch;
    type Query = PublicationQuery;

    fn validate_create(input: PublicationInput) -> Result<NewPublication, ValidationErrors> {
        let mut v = Validator::new();
        let title = v.required("title", input.title, text(TITLE_MAX_LENGTH));
        let document_url = v.required("documentUrl", input.document_url, link);
        let category = v.required("category", input.category, text(SHORT_TEXT_MAX_LENGTH));
        let authors = validate_authors(&mut v, "authors", input.authors.unwrap_or_default());
        let thumbnail = v.optional("thumbnail", input.thumbnail.flatten(), link);

        match (title, document_url, category) {
            (Some(title), Some(document_url), Some(category)) => v.finish(NewPublication {
                title,
                document_url,
                category,
                authors,
                thumbnail,
            }),
            _ => Err(v.into_errors()),
        }
    }

    fn validate_patch(input: PublicationInput) -> Result<PublicationPatch, ValidationErrors> {
        let mut v = Validator::new();
        let patch = PublicationPatch {
            title: v.optional("title", input.title, text(TITLE_MAX_LENGTH)),
            document_url: v.optional("documentUrl", input.document_url, link),
            category: v.optional("category", input.category, text(SHORT_TEXT_MAX_LENGTH)),
            authors: input
                .authors
                .map(|authors| validate_authors(&mut v, "authors", authors)),
            thumbnail: v.clearable("thumbnail", input.thumbnail, link),
        };
        v.finish(patch)
    }

    fn list_filter(query: &PublicationQuery) -> Filter {
        match query.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => Filter::new().equals("category", category),
            _ => Filter::new(),
        }
    }
}
