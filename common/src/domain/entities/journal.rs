use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    Author, AuthorInput, Entity, NoFilter, SHORT_TEXT_MAX_LENGTH, Singleton, SingletonPatch,
    TITLE_MAX_LENGTH, validate_authors,
};
use crate::domain::validation::{ValidationErrors, Validator, link, plain, text};
use crate::domain::{DocumentId, Email};

pub const JOURNAL_ARTICLES_COLLECTION: &str = "journalarticles";
pub const JOURNAL_CONTENTS_COLLECTION: &str = "journalcontents";

pub const DEFAULT_JOURNAL_PAGE_TITLE: &str = "VRL Journal";

// Journal articles

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalArticle {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub document_url: String,
    #[serde(default)]
    pub volume: Option<u32>,
    #[serde(default)]
    pub issue: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalArticleInput {
    pub title: Option<String>,
    pub authors: Option<Vec<AuthorInput>>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub document_url: Option<String>,
    pub volume: Option<u32>,
    pub issue: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJournalArticle {
    pub title: String,
    pub authors: Vec<Author>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub document_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalArticlePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<Author>>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<u32>,
}

fn parse_keywords(raw: Vec<String>) -> Result<Vec<String>, String> {
    Ok(raw
        .into_iter()
        .map(|k| k.trim().to_owned())
        .filter(|k| !k.is_empty())
        .collect())
}

fn positive(raw: u32) -> Result<u32, String> {
    if raw == 0 {
        Err("must be a positive number".to_owned())
    } else {
        Ok(raw)
    }
}

impl Entity for JournalArticle {
    const COLLECTION: &'static str = JOURNAL_ARTICLES_COLLECTION;
    const NAME: &'static str = "Journal article";

    type Input = JournalArticleInput;
    type Draft = NewJournalArticle;
    type Patch = JournalArticlePatch;
    type Query = NoFilter;

    fn validate_create(input: JournalArticleInput) -> Result<NewJournalArticle, ValidationErrors> {
        let mut v = Validator::new();
        let title = v.required("title", input.title, text(TITLE_MAX_LENGTH));
        let authors = validate_authors(&mut v, "authors", input.authors.unwrap_or_default());
        let abstract_text = v
            .optional("abstract", input.abstract_text, plain)
            .unwrap_or_default();
        let keywords = v
            .optional("keywords", input.keywords, parse_keywords)
            .unwrap_or_default();
        let document_url = v.required("documentUrl", input.document_url, link);
        let volume = v.optional("volume", input.volume, positive);
        let issue = v.optional("issue", input.issue, positive);

        match (title, document_url) {
            (Some(title), Some(document_url)) => v.finish(NewJournalArticle {
                title,
                authors,
                abstract_text,
                keywords,
                document_url,
                volume,
                issue,
            }),
            _ => Err(v.into_errors()),
        }
    }

    fn validate_patch(input: JournalArticleInput) -> Result<JournalArticlePatch, ValidationErrors> {
        let mut v = Validator::new();
        let patch = JournalArticlePatch {
            title: v.optional("title", input.title, text(TITLE_MAX_LENGTH)),
            authors: input
                .authors
                .map(|authors| validate_authors(&mut v, "authors", authors)),
            abstract_text: v.optional("abstract", input.abstract_text, plain),
            keywords: v.optional("keywords", input.keywords, parse_keywords),
            document_url: v.optional("documentUrl", input.document_url, link),
            volume: v.optional("volume", input.volume, positive),
            issue: v.optional("issue", input.issue, positive),
        };
        v.finish(patch)
    }
}

// Journal landing page

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalContent {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    #[serde(default = "default_page_title")]
    pub page_title: String,
    #[serde(default)]
    pub welcome_text: String,
    #[serde(default)]
    pub aims: String,
    #[serde(default)]
    pub peer_review_policy: String,
    #[serde(default)]
    pub publication_policy: String,
    #[serde(default)]
    pub open_access_policy: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub chief_editors: Vec<Author>,
    #[serde(default)]
    pub submission_email: Option<Email>,
    #[serde(default)]
    pub submission_instructions: String,
    #[serde(default)]
    pub formatting_guidelines: String,
    #[serde(default)]
    pub max_word_count: Option<u32>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_page_title() -> String {
    DEFAULT_JOURNAL_PAGE_TITLE.to_owned()
}

impl Default for JournalContent {
    fn default() -> Self {
        Self {
            id: None,
            page_title: default_page_title(),
            welcome_text: String::new(),
            aims: String::new(),
            peer_review_policy: String::new(),
            publication_policy: String::new(),
            open_access_policy: String::new(),
            publisher: String::new(),
            chief_editors: Vec::new(),
            submission_email: None,
            submission_instructions: String::new(),
            formatting_guidelines: String::new(),
            max_word_count: None,
            image: None,
            version: 0,
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalContentInput {
    pub page_title: Option<String>,
    pub welcome_text: Option<String>,
    pub aims: Option<String>,
    pub peer_review_policy: Option<String>,
    pub publication_policy: Option<String>,
    pub open_access_policy: Option<String>,
    pub publisher: Option<String>,
    pub chief_editors: Option<Vec<AuthorInput>>,
    pub submission_email: Option<String>,
    pub submission_instructions: Option<String>,
    pub formatting_guidelines: Option<String>,
    pub max_word_count: Option<u32>,
    pub image: Option<String>,
    /// version the editor loaded, checked before the write
    pub version: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalContentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub welcome_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aims: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_review_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_access_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chief_editors: Option<Vec<Author>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_email: Option<Email>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatting_guidelines: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_word_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Singleton for JournalContent {
    const COLLECTION: &'static str = JOURNAL_CONTENTS_COLLECTION;
    const NAME: &'static str = "Journal content";

    type Input = JournalContentInput;
    type Patch = JournalContentPatch;

    fn validate_patch(
        input: JournalContentInput,
    ) -> Result<SingletonPatch<JournalContentPatch>, ValidationErrors> {
        let mut v = Validator::new();
        let fields = JournalContentPatch {
            page_title: v.optional("pageTitle", input.page_title, text(SHORT_TEXT_MAX_LENGTH)),
            welcome_text: v.optional("welcomeText", input.welcome_text, plain),
            aims: v.optional("aims", input.aims, plain),
            peer_review_policy: v.optional("peerReviewPolicy", input.peer_review_policy, plain),
            publication_policy: v.optional("publicationPolicy", input.publication_policy, plain),
            open_access_policy: v.optional("openAccessPolicy", input.open_access_policy, plain),
            publisher: v.optional("publisher", input.publisher, plain),
            chief_editors: input
                .chief_editors
                .map(|editors| validate_authors(&mut v, "chiefEditors", editors)),
            submission_email: v.optional("submissionEmail", input.submission_email, Email::parse),
            submission_instructions: v.optional(
                "submissionInstructions",
                input.submission_instructions,
                plain,
            ),
            formatting_guidelines: v.optional(
                "formattingGuidelines",
                input.formatting_guidelines,
                plain,
            ),
            max_word_count: v.optional("maxWordCount", input.max_word_count, positive),
            image: v.optional("image", input.image, link),
        };
        let expected_version = v.optional("version", input.version, |version| {
            if version < 0 {
                Err("must not be negative".to_owned())
            } else {
                Ok(version)
            }
        });
        v.finish(SingletonPatch {
            fields,
            expected_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::persistence::{decode, encode};
    use mongodb::bson::doc;

    #[test]
    fn article_requires_title_and_document() {
        let errors = JournalArticle::validate_create(JournalArticleInput::default()).unwrap_err();
        assert!(errors.contains("title"));
        assert!(errors.contains("documentUrl"));
    }

    #[test]
    fn article_drops_blank_keywords_and_rejects_zero_volume() {
        let draft = JournalArticle::validate_create(JournalArticleInput {
            title: Some("Wetland carbon flux".into()),
            document_url: Some("/uploads/flux.pdf".into()),
            keywords: Some(vec![" carbon ".into(), "".into()]),
            ..JournalArticleInput::default()
        })
        .unwrap();
        assert_eq!(draft.keywords, vec!["carbon".to_owned()]);

        let errors = JournalArticle::validate_patch(JournalArticleInput {
            volume: Some(0),
            ..JournalArticleInput::default()
        })
        .unwrap_err();
        assert!(errors.contains("volume"));
    }

    #[test]
    fn article_abstract_uses_reserved_word_on_the_wire() {
        let draft = JournalArticle::validate_create(JournalArticleInput {
            title: Some("Wetland carbon flux".into()),
            document_url: Some("/uploads/flux.pdf".into()),
            abstract_text: Some("We measure...".into()),
            ..JournalArticleInput::default()
        })
        .unwrap();
        let document = encode(&draft).unwrap();
        assert_eq!(document.get_str("abstract").unwrap(), "We measure...");
    }

    #[test]
    fn journal_content_defaults_page_title() {
        assert_eq!(JournalContent::default().page_title, "VRL Journal");

        let stored: JournalContent = decode(doc! { "aims": "Open science" }).unwrap();
        assert_eq!(stored.page_title, "VRL Journal");
        assert_eq!(stored.aims, "Open science");
        assert_eq!(stored.version, 0);
    }

    #[test]
    fn journal_content_patch_carries_expected_version() {
        let patch = JournalContent::validate_patch(JournalContentInput {
            aims: Some("Open science".into()),
            version: Some(3),
            ..JournalContentInput::default()
        })
        .unwrap();
        assert_eq!(patch.expected_version, Some(3));
        assert_eq!(patch.fields.aims.as_deref(), Some("Open science"));

        let document = encode(&patch.fields).unwrap();
        assert!(!document.contains_key("version"));
    }

    #[test]
    fn journal_content_patch_reports_nested_editor_errors() {
        let errors = JournalContent::validate_patch(JournalContentInput {
            chief_editors: Some(vec![AuthorInput::default()]),
            submission_email: Some("editor".into()),
            ..JournalContentInput::default()
        })
        .unwrap_err();
        assert!(errors.contains("chiefEditors[0].name"));
        assert!(errors.contains("submissionEmail"));
    }
}
