use chrono::Utc;
use vrl_common::{
    CREATED_FIELD_NAME, Email, ID_FIELD_NAME, UPDATED_FIELD_NAME,
    entities::user::{
        Credentials, EMAIL_FIELD_NAME, NewUser, Registration, USERS_COLLECTION, User, UserChanges,
    },
    password::verify_password,
    persistence::{
        DocumentStore, Filter, FindQuery, SortOrder, StoreError, Update, decode, encode, timestamp,
    },
};

use crate::domain::repository::{
    Page, PageRequest, RepositoryError, decode_all, empty_update, parse_id,
};

const USER_NAME: &str = "User";

fn email_taken() -> RepositoryError {
    RepositoryError::Conflict("email is already registered".to_owned())
}

fn hashing_failed(error: impl ToString) -> RepositoryError {
    RepositoryError::Store(StoreError::Encode(error.to_string()))
}

/// Accounts. Users are never hard deleted.
pub struct UserRepository<'a, S> {
    store: &'a S,
}

impl<'a, S: DocumentStore> UserRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let filter = Filter::new().equals(EMAIL_FIELD_NAME, email.as_ref());
        match self.store.find_one(USERS_COLLECTION, &filter).await? {
            Some(document) => Ok(Some(decode(document)?)),
            None => Ok(None),
        }
    }

    pub async fn register(&self, registration: Registration) -> Result<User, RepositoryError> {
        if self.find_by_email(&registration.email).await?.is_some() {
            return Err(email_taken());
        }

        let user = NewUser::from_registration(registration).map_err(hashing_failed)?;
        let now = timestamp(Utc::now());
        let mut document = encode(&user)?;
        document.insert(CREATED_FIELD_NAME, now.clone());
        document.insert(UPDATED_FIELD_NAME, now);

        let id = match self.store.insert_one(USERS_COLLECTION, document).await {
            Err(StoreError::DuplicateKey(_)) => return Err(email_taken()),
            result => result?,
        };
        tracing::info!("registered user {} with role {}", id, user.role);

        let document = self
            .store
            .find_one(USERS_COLLECTION, &Filter::by_object_id(id))
            .await?
            .ok_or(RepositoryError::NotFound(USER_NAME))?;
        Ok(decode(document)?)
    }

    /// The account matching the credentials, `None` for an unknown email or a wrong password.
    pub async fn verify_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .find_by_email(&credentials.email)
            .await?
            .filter(|user| verify_password(&credentials.password, &user.password_hash)))
    }

    pub async fn get(&self, id: &str) -> Result<User, RepositoryError> {
        let id = parse_id(id)?;
        let document = self
            .store
            .find_one(USERS_COLLECTION, &Filter::by_id(&id))
            .await?
            .ok_or(RepositoryError::NotFound(USER_NAME))?;
        Ok(decode(document)?)
    }

    pub async fn list(&self, page: PageRequest) -> Result<Page<User>, RepositoryError> {
        let filter = Filter::new();
        let find = FindQuery::new(filter.clone())
            .sort_by(CREATED_FIELD_NAME, SortOrder::Descending)
            .sort_by(ID_FIELD_NAME, SortOrder::Descending)
            .page(page.skip(), page.limit as i64);

        let (documents, total) = futures::try_join!(
            self.store.find(USERS_COLLECTION, &find),
            self.store.count(USERS_COLLECTION, &filter),
        )?;
        Ok(Page::new(decode_all(USERS_COLLECTION, documents), page, total))
    }

    pub async fn update(&self, id: &str, changes: UserChanges) -> Result<User, RepositoryError> {
        let id = parse_id(id)?;
        if changes.is_empty() {
            return Err(empty_update());
        }
        if let Some(email) = &changes.email {
            if let Some(owner) = self.find_by_email(email).await? {
                if owner.id != id {
                    return Err(email_taken());
                }
            }
        }

        let patch = changes.into_patch().map_err(hashing_failed)?;
        let update = Update::new()
            .set_all(encode(&patch)?)
            .set(UPDATED_FIELD_NAME, timestamp(Utc::now()));

        let updated = match self
            .store
            .update_one(USERS_COLLECTION, &Filter::by_id(&id), &update)
            .await
        {
            Err(StoreError::DuplicateKey(_)) => return Err(email_taken()),
            result => result?,
        };
        let document = updated.ok_or(RepositoryError::NotFound(USER_NAME))?;
        Ok(decode(document)?)
    }
}
