use chrono::Utc;
use vrl_common::{
    CREATED_FIELD_NAME, DocumentId, Role, UPDATED_FIELD_NAME,
    entities::user::{EMAIL_FIELD_NAME, NewUser, RegisterUserRequest, USERS_COLLECTION},
    persistence::{DocumentStore, Filter, Update, document_id, encode, timestamp},
};

use crate::domain::runner::MigrationError;

const ROLE_FIELD_NAME: &str = "role";

#[derive(Clone, Debug, PartialEq)]
pub enum AdminAccount {
    Created(DocumentId),
    /// an account with the email already existed and now has the admin role
    Promoted,
}

/// Creates an administrator, or promotes the existing account with the same email.
pub async fn create_admin<S: DocumentStore>(
    store: &S,
    name: String,
    email: String,
    password: String,
) -> Result<AdminAccount, MigrationError> {
    let registration = RegisterUserRequest {
        name: Some(name),
        email: Some(email),
        password: Some(password),
        role: Some(Role::Admin.to_string()),
    }
    .validate()?;

    let by_email = Filter::new().equals(EMAIL_FIELD_NAME, registration.email.as_ref());
    let now = Utc::now();

    if store.find_one(USERS_COLLECTION, &by_email).await?.is_some() {
        let update = Update::new()
            .set(ROLE_FIELD_NAME, Role::Admin.to_string())
            .set(UPDATED_FIELD_NAME, timestamp(now));
        store.update_one(USERS_COLLECTION, &by_email, &update).await?;
        tracing::info!("promoted {} to admin", registration.email);
        return Ok(AdminAccount::Promoted);
    }

    let user = NewUser::from_registration(registration)?;
    let mut document = encode(&user)?;
    document.insert(CREATED_FIELD_NAME, timestamp(now));
    document.insert(UPDATED_FIELD_NAME, timestamp(now));

    let id = store.insert_one(USERS_COLLECTION, document).await?;
    tracing::info!("created admin {}", user.email);
    Ok(AdminAccount::Created(document_id(id)?))
}
