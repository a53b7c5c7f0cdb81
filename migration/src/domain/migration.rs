use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime};
use mongodb::bson::{Bson, Document};
use vrl_common::{
    CREATED_FIELD_NAME, ID_FIELD_NAME,
    entities::{
        event::{
            EVENT_DATE_FORMAT, EVENT_TIME_FORMAT, EVENTS_COLLECTION, EventStatus,
            STATUS_FIELD_NAME,
        },
        journal::{DEFAULT_JOURNAL_PAGE_TITLE, JOURNAL_ARTICLES_COLLECTION, JOURNAL_CONTENTS_COLLECTION},
        publication::PUBLICATIONS_COLLECTION,
        staff::STAFFS_COLLECTION,
        user::{EMAIL_FIELD_NAME, USERS_COLLECTION},
    },
    persistence::{DocumentStore, Filter, FindQuery, IndexDefinition, StoreError, Update},
};

const THUMBNAIL_FIELD_NAME: &str = "thumbnail";
const PAGE_TITLE_FIELD_NAME: &str = "pageTitle";
const DATE_FIELD_NAME: &str = "date";
const TIME_FIELD_NAME: &str = "time";
const LEGACY_STATUS_FIELD_NAME: &str = "legacyStatus";

const LEGACY_DATE_FORMATS: [&str; 6] = [
    EVENT_DATE_FORMAT,
    "%Y/%m/%d",
    "%d %B %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%b %d, %Y",
];
const LEGACY_TIME_FORMATS: [&str; 5] = [
    EVENT_TIME_FORMAT,
    "%H:%M:%S",
    "%I:%M %p",
    "%I:%M%p",
    "%I.%M %p",
];

/// Known schema changes, kept in version order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Migration {
    CreatePublications,
    CreateStaffs,
    RemoveJournalArticleThumbnail,
    BackfillJournalPageTitle,
    CreateUsersEmailIndex,
    NormalizeEventFields,
}

impl Migration {
    pub const ALL: [Migration; 6] = [
        Migration::CreatePublications,
        Migration::CreateStaffs,
        Migration::RemoveJournalArticleThumbnail,
        Migration::BackfillJournalPageTitle,
        Migration::CreateUsersEmailIndex,
        Migration::NormalizeEventFields,
    ];

    /// Sortable timestamp, `YYYYMMDDhhmmss`.
    pub fn version(self) -> &'static str {
        match self {
            Migration::CreatePublications => "20240105090000",
            Migration::CreateStaffs => "20240212100000",
            Migration::RemoveJournalArticleThumbnail => "20240318110000",
            Migration::BackfillJournalPageTitle => "20240402120000",
            Migration::CreateUsersEmailIndex => "20240415130000",
            Migration::NormalizeEventFields => "20240501140000",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Migration::CreatePublications => "create-publications",
            Migration::CreateStaffs => "create-staffs",
            Migration::RemoveJournalArticleThumbnail => "remove-journal-article-thumbnail",
            Migration::BackfillJournalPageTitle => "backfill-journal-page-title",
            Migration::CreateUsersEmailIndex => "create-users-email-index",
            Migration::NormalizeEventFields => "normalize-event-fields",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Migration::CreatePublications => {
                "create the publications collection with title, category and createdAt indexes"
            }
            Migration::CreateStaffs => "create the staffs collection with a createdAt index",
            Migration::RemoveJournalArticleThumbnail => {
                "remove the thumbnail field from journal articles"
            }
            Migration::BackfillJournalPageTitle => {
                "set the default page title on journal contents without one"
            }
            Migration::CreateUsersEmailIndex => "enforce unique user emails",
            Migration::NormalizeEventFields => {
                "rewrite free text event status, date and time into their canonical forms"
            }
        }
    }

    pub fn find(version: &str) -> Option<Migration> {
        Self::ALL.into_iter().find(|m| m.version() == version)
    }

    /// Applies the change. Safe to run against an already migrated store.
    pub async fn up<S: DocumentStore>(self, store: &S) -> Result<(), StoreError> {
        match self {
            Migration::CreatePublications => {
                ensure_collection(store, PUBLICATIONS_COLLECTION).await?;
                for index in [
                    IndexDefinition::ascending("title"),
                    IndexDefinition::ascending("category"),
                    IndexDefinition::descending(CREATED_FIELD_NAME),
                ] {
                    ensure_index(store, PUBLICATIONS_COLLECTION, &index).await?;
                }
            }
            Migration::CreateStaffs => {
                ensure_collection(store, STAFFS_COLLECTION).await?;
                ensure_index(
                    store,
                    STAFFS_COLLECTION,
                    &IndexDefinition::descending(CREATED_FIELD_NAME),
                )
                .await?;
            }
            Migration::RemoveJournalArticleThumbnail => {
                let modified = store
                    .update_many(
                        JOURNAL_ARTICLES_COLLECTION,
                        &Filter::new().exists(THUMBNAIL_FIELD_NAME, true),
                        &Update::new().unset(THUMBNAIL_FIELD_NAME),
                    )
                    .await?;
                tracing::debug!("removed thumbnail from {} journal articles", modified);
            }
            Migration::BackfillJournalPageTitle => {
                let modified = store
                    .update_many(
                        JOURNAL_CONTENTS_COLLECTION,
                        &Filter::new().exists(PAGE_TITLE_FIELD_NAME, false),
                        &Update::new().set(PAGE_TITLE_FIELD_NAME, DEFAULT_JOURNAL_PAGE_TITLE),
                    )
                    .await?;
                tracing::debug!("backfilled page title on {} journal contents", modified);
            }
            Migration::CreateUsersEmailIndex => {
                ensure_index(
                    store,
                    USERS_COLLECTION,
                    &IndexDefinition::ascending(EMAIL_FIELD_NAME).unique(),
                )
                .await?;
            }
            Migration::NormalizeEventFields => {
                let events = store
                    .find(EVENTS_COLLECTION, &FindQuery::new(Filter::new()))
                    .await?;
                let mut normalized = 0;
                for event in events {
                    let update = normalize_event(&event);
                    if update.is_empty() {
                        continue;
                    }
                    let Ok(id) = event.get_object_id(ID_FIELD_NAME) else {
                        continue;
                    };
                    store
                        .update_one(EVENTS_COLLECTION, &Filter::by_object_id(id), &update)
                        .await?;
                    normalized += 1;
                }
                tracing::debug!("normalized {} events", normalized);
            }
        }
        Ok(())
    }

    /// Reverts the change as far as possible.
    pub async fn down<S: DocumentStore>(self, store: &S) -> Result<(), StoreError> {
        match self {
            Migration::CreatePublications => store.drop_collection(PUBLICATIONS_COLLECTION).await?,
            Migration::CreateStaffs => store.drop_collection(STAFFS_COLLECTION).await?,
            Migration::RemoveJournalArticleThumbnail => {
                // removed values are gone, only the field comes back
                store
                    .update_many(
                        JOURNAL_ARTICLES_COLLECTION,
                        &Filter::new(),
                        &Update::new().set(THUMBNAIL_FIELD_NAME, Bson::Null),
                    )
                    .await?;
            }
            Migration::BackfillJournalPageTitle => {
                store
                    .update_many(
                        JOURNAL_CONTENTS_COLLECTION,
                        &Filter::new(),
                        &Update::new().unset(PAGE_TITLE_FIELD_NAME),
                    )
                    .await?;
            }
            Migration::CreateUsersEmailIndex => {
                let index = IndexDefinition::ascending(EMAIL_FIELD_NAME).unique();
                store.drop_index(USERS_COLLECTION, &index.name()).await?;
            }
            Migration::NormalizeEventFields => {
                // only replaced statuses come back, reformatted dates and times stay canonical
                let query = FindQuery::new(Filter::new().exists(LEGACY_STATUS_FIELD_NAME, true));
                for event in store.find(EVENTS_COLLECTION, &query).await? {
                    let (Ok(id), Some(legacy)) = (
                        event.get_object_id(ID_FIELD_NAME),
                        event.get(LEGACY_STATUS_FIELD_NAME),
                    ) else {
                        continue;
                    };
                    let update = Update::new()
                        .set(STATUS_FIELD_NAME, legacy.clone())
                        .unset(LEGACY_STATUS_FIELD_NAME);
                    store
                        .update_one(EVENTS_COLLECTION, &Filter::by_object_id(id), &update)
                        .await?;
                }
            }
        }
        Ok(())
    }
}

/// Changes that bring one stored event to the canonical status, date and time
/// representation. Statuses outside the known set become inactive and the
/// original value is kept next to them. Unreadable dates and times are left as is.
fn normalize_event(event: &Document) -> Update {
    let id = event
        .get(ID_FIELD_NAME)
        .map(ToString::to_string)
        .unwrap_or_default();
    let mut update = Update::new();

    match event.get(STATUS_FIELD_NAME) {
        None | Some(Bson::Null) => {
            update = update.set(STATUS_FIELD_NAME, EventStatus::default().to_string());
        }
        Some(Bson::String(raw)) => match raw.parse::<EventStatus>() {
            Ok(status) if status.to_string() == *raw => {}
            Ok(status) => update = update.set(STATUS_FIELD_NAME, status.to_string()),
            Err(_) => {
                tracing::warn!("event {} has unknown status {:?}, marking it inactive", id, raw);
                update = update
                    .set(STATUS_FIELD_NAME, EventStatus::Inactive.to_string())
                    .set(LEGACY_STATUS_FIELD_NAME, raw.as_str());
            }
        },
        Some(other) => {
            tracing::warn!("event {} has a non text status, marking it inactive", id);
            update = update
                .set(STATUS_FIELD_NAME, EventStatus::Inactive.to_string())
                .set(LEGACY_STATUS_FIELD_NAME, other.clone());
        }
    }

    let date = match event.get(DATE_FIELD_NAME) {
        Some(Bson::String(raw)) => legacy_date(raw)
            .map(|date| date.format(EVENT_DATE_FORMAT).to_string())
            .filter(|canonical| canonical != raw),
        Some(Bson::DateTime(at)) => DateTime::from_timestamp_millis(at.timestamp_millis())
            .map(|at| at.date_naive().format(EVENT_DATE_FORMAT).to_string()),
        _ => None,
    };
    match date {
        Some(date) => update = update.set(DATE_FIELD_NAME, date),
        None if !readable(event, DATE_FIELD_NAME, |raw| {
            NaiveDate::parse_from_str(raw, EVENT_DATE_FORMAT).is_ok()
        }) =>
        {
            tracing::warn!("event {} keeps an unreadable date", id);
        }
        None => {}
    }

    let time = match event.get(TIME_FIELD_NAME) {
        Some(Bson::String(raw)) => legacy_time(raw)
            .map(|time| time.format(EVENT_TIME_FORMAT).to_string())
            .filter(|canonical| canonical != raw),
        _ => None,
    };
    match time {
        Some(time) => update = update.set(TIME_FIELD_NAME, time),
        None if !readable(event, TIME_FIELD_NAME, |raw| {
            NaiveTime::parse_from_str(raw, EVENT_TIME_FORMAT).is_ok()
        }) =>
        {
            tracing::warn!("event {} keeps an unreadable time", id);
        }
        None => {}
    }

    update
}

fn readable(event: &Document, field: &str, canonical: impl Fn(&str) -> bool) -> bool {
    matches!(event.get(field), Some(Bson::String(raw)) if canonical(raw.as_str()))
}

fn legacy_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    LEGACY_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|at| at.date_naive())
        })
}

fn legacy_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    LEGACY_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.version(), self.slug())
    }
}

async fn ensure_collection<S: DocumentStore>(store: &S, name: &str) -> Result<(), StoreError> {
    if store.collection_names().await?.contains(name) {
        tracing::debug!("collection {} already exists", name);
        return Ok(());
    }
    store.create_collection(name).await
}

async fn ensure_index<S: DocumentStore>(
    store: &S,
    collection: &str,
    index: &IndexDefinition,
) -> Result<(), StoreError> {
    let name = index.name();
    if store.index_names(collection).await?.contains(&name) {
        tracing::debug!("index {} on {} already exists", name, collection);
        return Ok(());
    }
    store.create_index(collection, index).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use mongodb::bson::doc;
    use vrl_common::test_utils::InMemoryStore;

    use super::*;

    #[test]
    fn migrations_are_listed_in_version_order() {
        let versions: Vec<&str> = Migration::ALL.iter().map(|m| m.version()).collect();
        let mut sorted = versions.clone();
        sorted.sort();
        assert_eq!(versions, sorted);
        assert_eq!(
            Migration::CreatePublications.to_string(),
            "20240105090000-create-publications"
        );
        assert_eq!(
            Migration::find("20240318110000"),
            Some(Migration::RemoveJournalArticleThumbnail)
        );
    }

    #[tokio::test]
    async fn create_publications_is_idempotent() {
        let store = InMemoryStore::new();
        Migration::CreatePublications.up(&store).await.unwrap();
        Migration::CreatePublications.up(&store).await.unwrap();

        let names = store.index_names(PUBLICATIONS_COLLECTION).await.unwrap();
        let expected: HashSet<String> = ["_id_", "title_1", "category_1", "createdAt_-1"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names, expected);

        Migration::CreatePublications.down(&store).await.unwrap();
        assert!(!store.collection_names().await.unwrap().contains(PUBLICATIONS_COLLECTION));
    }

    #[tokio::test]
    async fn create_staffs_adds_created_index() {
        let store = InMemoryStore::new();
        Migration::CreateStaffs.up(&store).await.unwrap();
        let names = store.index_names(STAFFS_COLLECTION).await.unwrap();
        assert!(names.contains("createdAt_-1"));
    }

    #[tokio::test]
    async fn thumbnail_removal_is_lossy_on_the_way_down() {
        let store = InMemoryStore::new();
        store.seed(
            JOURNAL_ARTICLES_COLLECTION,
            doc! { "title": "Wetlands", "thumbnail": "/uploads/wetlands.png" },
        );
        store.seed(JOURNAL_ARTICLES_COLLECTION, doc! { "title": "Dunes" });

        Migration::RemoveJournalArticleThumbnail.up(&store).await.unwrap();
        for article in store.documents(JOURNAL_ARTICLES_COLLECTION) {
            assert!(!article.contains_key(THUMBNAIL_FIELD_NAME));
        }

        Migration::RemoveJournalArticleThumbnail.down(&store).await.unwrap();
        for article in store.documents(JOURNAL_ARTICLES_COLLECTION) {
            assert_eq!(article.get(THUMBNAIL_FIELD_NAME), Some(&Bson::Null));
        }
    }

    #[tokio::test]
    async fn page_title_backfill_keeps_existing_titles() {
        let store = InMemoryStore::new();
        store.seed(JOURNAL_CONTENTS_COLLECTION, doc! { "aims": "Open science" });
        store.seed(JOURNAL_CONTENTS_COLLECTION, doc! { "pageTitle": "Custom" });

        Migration::BackfillJournalPageTitle.up(&store).await.unwrap();
        let titles: Vec<String> = store
            .documents(JOURNAL_CONTENTS_COLLECTION)
            .iter()
            .map(|d| d.get_str(PAGE_TITLE_FIELD_NAME).unwrap().to_owned())
            .collect();
        assert_eq!(titles, vec!["VRL Journal", "Custom"]);

        Migration::BackfillJournalPageTitle.down(&store).await.unwrap();
        for content in store.documents(JOURNAL_CONTENTS_COLLECTION) {
            assert!(!content.contains_key(PAGE_TITLE_FIELD_NAME));
        }
    }

    #[tokio::test]
    async fn event_fields_are_normalized_and_unknown_statuses_kept_aside() {
        let store = InMemoryStore::new();
        let upcoming = store.seed(
            EVENTS_COLLECTION,
            doc! { "title": "Field trip", "status": "Upcoming", "date": "May 17, 2024", "time": "2:30 PM" },
        );
        let lowercase = store.seed(
            EVENTS_COLLECTION,
            doc! { "title": "Open lab", "status": "active", "date": "2024-05-18", "time": "09:00" },
        );
        let untouched = store.seed(
            EVENTS_COLLECTION,
            doc! { "title": "Seminar", "status": "Inactive", "date": "someday", "time": "14:00" },
        );

        Migration::NormalizeEventFields.up(&store).await.unwrap();
        Migration::NormalizeEventFields.up(&store).await.unwrap();

        let event = |id| {
            store
                .documents(EVENTS_COLLECTION)
                .into_iter()
                .find(|d| d.get_object_id(ID_FIELD_NAME).ok() == Some(id))
                .unwrap()
        };
        let trip = event(upcoming);
        assert_eq!(trip.get_str(STATUS_FIELD_NAME).unwrap(), "Inactive");
        assert_eq!(trip.get_str(LEGACY_STATUS_FIELD_NAME).unwrap(), "Upcoming");
        assert_eq!(trip.get_str(DATE_FIELD_NAME).unwrap(), "2024-05-17");
        assert_eq!(trip.get_str(TIME_FIELD_NAME).unwrap(), "14:30");

        let lab = event(lowercase);
        assert_eq!(lab.get_str(STATUS_FIELD_NAME).unwrap(), "Active");
        assert!(!lab.contains_key(LEGACY_STATUS_FIELD_NAME));

        let seminar = event(untouched);
        assert_eq!(seminar.get_str(DATE_FIELD_NAME).unwrap(), "someday");
        assert_eq!(seminar.get_str(STATUS_FIELD_NAME).unwrap(), "Inactive");

        Migration::NormalizeEventFields.down(&store).await.unwrap();
        let trip = event(upcoming);
        assert_eq!(trip.get_str(STATUS_FIELD_NAME).unwrap(), "Upcoming");
        assert!(!trip.contains_key(LEGACY_STATUS_FIELD_NAME));
        assert_eq!(trip.get_str(DATE_FIELD_NAME).unwrap(), "2024-05-17");
    }

    #[tokio::test]
    async fn users_email_index_is_unique() {
        let store = InMemoryStore::new();
        Migration::CreateUsersEmailIndex.up(&store).await.unwrap();
        store
            .insert_one(USERS_COLLECTION, doc! { "email": "ada@example.org" })
            .await
            .unwrap();
        let duplicate = store
            .insert_one(USERS_COLLECTION, doc! { "email": "ada@example.org" })
            .await;
        assert!(matches!(duplicate, Err(StoreError::DuplicateKey(_))));

        Migration::CreateUsersEmailIndex.down(&store).await.unwrap();
        assert!(!store.index_names(USERS_COLLECTION).await.unwrap().contains("email_1"));
    }
}
