use std::marker::PhantomData;

use chrono::Utc;
use vrl_common::{
    CREATED_FIELD_NAME, ID_FIELD_NAME, UPDATED_FIELD_NAME,
    entities::Entity,
    persistence::{
        DocumentStore, Filter, FindQuery, SortOrder, Update, decode, encode, timestamp,
    },
};

use crate::domain::repository::{
    Page, PageRequest, RepositoryError, decode_all, empty_update, parse_id,
};

/// Create / read / partial update / delete for one entity collection.
///
/// Every write validates its input first, a rejected input never reaches the store.
pub struct EntityRepository<'a, S, E> {
    store: &'a S,
    entity: PhantomData<E>,
}

impl<'a, S: DocumentStore, E: Entity> EntityRepository<'a, S, E> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            entity: PhantomData,
        }
    }

    /// Newest first, documents created in the same millisecond by descending id.
    pub async fn list(&self, query: &E::Query, page: PageRequest) -> Result<Page<E>, RepositoryError> {
        let filter = E::list_filter(query);
        let find = FindQuery::new(filter.clone())
            .sort_by(CREATED_FIELD_NAME, SortOrder::Descending)
            .sort_by(ID_FIELD_NAME, SortOrder::Descending)
            .page(page.skip(), page.limit as i64);

        let (documents, total) = futures::try_join!(
            self.store.find(E::COLLECTION, &find),
            self.store.count(E::COLLECTION, &filter),
        )?;

        Ok(Page::new(decode_all(E::COLLECTION, documents), page, total))
    }

    pub async fn get(&self, id: &str) -> Result<E, RepositoryError> {
        let id = parse_id(id)?;
        let document = self
            .store
            .find_one(E::COLLECTION, &Filter::by_id(&id))
            .await?
            .ok_or(RepositoryError::NotFound(E::NAME))?;
        Ok(decode(document)?)
    }

    pub async fn create(&self, input: E::Input) -> Result<E, RepositoryError> {
        let draft = E::validate_create(input)?;

        let now = timestamp(Utc::now());
        let mut document = encode(&draft)?;
        document.insert(CREATED_FIELD_NAME, now.clone());
        document.insert(UPDATED_FIELD_NAME, now);

        let id = self.store.insert_one(E::COLLECTION, document).await?;
        tracing::debug!("created {} {}", E::NAME, id);

        let document = self
            .store
            .find_one(E::COLLECTION, &Filter::by_object_id(id))
            .await?
            .ok_or(RepositoryError::NotFound(E::NAME))?;
        Ok(decode(document)?)
    }

    /// Merges the supplied fields into the stored document and refreshes `updatedAt`.
    /// Clearable fields sent as `null` are removed.
    pub async fn update(&self, id: &str, input: E::Input) -> Result<E, RepositoryError> {
        let id = parse_id(id)?;
        let patch = E::validate_patch(input)?;

        let fields = encode(&patch)?;
        if fields.is_empty() {
            return Err(empty_update());
        }
        let update = Update::new()
            .patch(fields)
            .set(UPDATED_FIELD_NAME, timestamp(Utc::now()));

        let document = self
            .store
            .update_one(E::COLLECTION, &Filter::by_id(&id), &update)
            .await?
            .ok_or(RepositoryError::NotFound(E::NAME))?;
        Ok(decode(document)?)
    }

    pub async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let id = parse_id(id)?;
        if self.store.delete_one(E::COLLECTION, &Filter::by_id(&id)).await? {
            tracing::debug!("deleted {} {}", E::NAME, id);
            Ok(())
        } else {
            Err(RepositoryError::NotFound(E::NAME))
        }
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{doc, oid::ObjectId};
    use vrl_common::{
        entities::{
            AuthorInput, NoFilter,
            event::{Event, EventInput, EventQuery, EventStatus},
            publication::{Publication, PublicationInput, PublicationQuery},
            staff::{Staff, StaffInput},
        },
        test_utils::InMemoryStore,
    };

    use super::*;

    const FIRST_PAGE: PageRequest = PageRequest { page: 1, limit: 10 };

    fn publication(title: &str, category: &str) -> PublicationInput {
        PublicationInput {
            title: Some(title.into()),
            document_url: Some(format!("https://vrl.example.org/{category}.pdf")),
            category: Some(category.into()),
            authors: Some(vec![AuthorInput::named("Ada Lovelace")]),
            thumbnail: None,
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_the_stored_entity() {
        let store = InMemoryStore::new();
        let repository = EntityRepository::<_, Publication>::new(&store);

        let created = repository.create(publication("Flood maps", "report")).await.unwrap();
        assert_eq!(created.title, "Flood maps");
        assert_eq!(created.created_at, created.updated_at);

        let fetched = repository.get(created.id.as_ref()).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn rejected_create_writes_nothing() {
        let store = InMemoryStore::new();
        let repository = EntityRepository::<_, Publication>::new(&store);

        let error = repository
            .create(PublicationInput::default())
            .await
            .unwrap_err();
        assert!(matches!(error, RepositoryError::Validation(_)));
        assert!(store.documents("publications").is_empty());
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let store = InMemoryStore::new();
        let repository = EntityRepository::<_, Publication>::new(&store);
        let created = repository.create(publication("Old Title", "report")).await.unwrap();

        let updated = repository
            .update(
                created.id.as_ref(),
                PublicationInput {
                    title: Some("New Title".into()),
                    ..PublicationInput::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "New Title");
        assert_eq!(updated.document_url, created.document_url);
        assert_eq!(updated.category, created.category);
        assert_eq!(updated.authors, created.authors);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let store = InMemoryStore::new();
        let repository = EntityRepository::<_, Staff>::new(&store);
        let created = repository
            .create(StaffInput {
                name: Some("Grace Hopper".into()),
                designation: Some("Director".into()),
                ..StaffInput::default()
            })
            .await
            .unwrap();

        let error = repository
            .update(created.id.as_ref(), StaffInput::default())
            .await
            .unwrap_err();
        assert!(matches!(error, RepositoryError::Validation(errors) if errors.contains("body")));
    }

    #[tokio::test]
    async fn malformed_or_unknown_ids_are_distinguished() {
        let store = InMemoryStore::new();
        let repository = EntityRepository::<_, Staff>::new(&store);

        let malformed = repository.get("not-an-id").await.unwrap_err();
        assert!(matches!(malformed, RepositoryError::Validation(_)));

        let missing = repository.delete("507f1f77bcf86cd799439011").await.unwrap_err();
        assert!(matches!(missing, RepositoryError::NotFound("Staff member")));
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let store = InMemoryStore::new();
        let repository = EntityRepository::<_, Publication>::new(&store);
        for i in 0..3 {
            repository
                .create(publication(&format!("Report {i}"), "report"))
                .await
                .unwrap();
        }
        repository.create(publication("Thesis", "thesis")).await.unwrap();

        let query = PublicationQuery {
            category: Some("report".into()),
        };
        let page = repository
            .list(&query, PageRequest { page: 2, limit: 2 })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 1);
        assert!(page.items.iter().all(|p| p.category == "report"));
    }

    #[tokio::test]
    async fn list_filters_events_by_status() {
        let store = InMemoryStore::new();
        let repository = EntityRepository::<_, Event>::new(&store);
        for status in ["Active", "Inactive"] {
            repository
                .create(EventInput {
                    title: Some(format!("{status} event")),
                    date: Some("2024-06-01".into()),
                    time: Some("10:00".into()),
                    status: Some(status.into()),
                    ..EventInput::default()
                })
                .await
                .unwrap();
        }

        let query = EventQuery {
            status: Some(EventStatus::Inactive),
        };
        let page = repository.list(&query, FIRST_PAGE).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].status, EventStatus::Inactive);

        let all = EntityRepository::<_, Staff>::new(&store)
            .list(&NoFilter {}, FIRST_PAGE)
            .await
            .unwrap();
        assert_eq!(all.total, 0);
    }

    #[tokio::test]
    async fn list_orders_same_instant_documents_by_id() {
        let store = InMemoryStore::new();
        let now = timestamp(Utc::now());
        let older = ObjectId::parse_str("65f1a0000000000000000001").unwrap();
        let newer = ObjectId::parse_str("65f1a0000000000000000002").unwrap();
        for id in [older, newer] {
            store.seed(
                "publications",
                doc! {
                    "_id": id,
                    "title": "Same instant",
                    "documentUrl": "https://vrl.example.org/same.pdf",
                    "category": "report",
                    "createdAt": now.clone(),
                    "updatedAt": now.clone(),
                },
            );
        }
        let repository = EntityRepository::<_, Publication>::new(&store);
        let query = PublicationQuery::default();

        let first = repository
            .list(&query, PageRequest { page: 1, limit: 1 })
            .await
            .unwrap();
        let second = repository
            .list(&query, PageRequest { page: 2, limit: 1 })
            .await
            .unwrap();
        assert_eq!(first.items[0].id.as_ref(), newer.to_hex());
        assert_eq!(second.items[0].id.as_ref(), older.to_hex());
    }

    #[tokio::test]
    async fn delete_removes_the_document() {
        let store = InMemoryStore::new();
        let repository = EntityRepository::<_, Publication>::new(&store);
        let created = repository.create(publication("Gone", "report")).await.unwrap();

        repository.delete(created.id.as_ref()).await.unwrap();
        let error = repository.get(created.id.as_ref()).await.unwrap_err();
        assert!(matches!(error, RepositoryError::NotFound(_)));
    }
}
