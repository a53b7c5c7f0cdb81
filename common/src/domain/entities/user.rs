use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::password::{PasswordHashError, hash_password};
use crate::domain::validation::{ValidationErrors, Validator};
use crate::domain::{DocumentId, Email, Password, Role, UserName};

pub const USERS_COLLECTION: &str = "users";
pub const EMAIL_FIELD_NAME: &str = "email";

/// An account as stored. The password hash is read from the store but never
/// written back out through serialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: UserName,
    pub email: Email,
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Registration {
    pub name: UserName,
    pub email: Email,
    pub password: Password,
    pub role: Role,
}

impl RegisterUserRequest {
    pub fn validate(self) -> Result<Registration, ValidationErrors> {
        let mut v = Validator::new();
        let name = v.required("name", self.name, UserName::parse);
        let email = v.required("email", self.email, Email::parse);
        let password = v.required("password", self.password, Password::parse);
        let role = v
            .optional("role", self.role, |raw: String| raw.parse::<Role>())
            .unwrap_or_default();

        match (name, email, password) {
            (Some(name), Some(email), Some(password)) => v.finish(Registration {
                name,
                email,
                password,
                role,
            }),
            _ => Err(v.into_errors()),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone)]
pub struct Credentials {
    pub email: Email,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, ValidationErrors> {
        let mut v = Validator::new();
        let email = v.required("email", self.email, Email::parse);
        // strength rules apply at registration only
        let password = v.required("password", self.password, |raw: String| {
            if raw.is_empty() {
                Err("is required".to_owned())
            } else {
                Ok(raw)
            }
        });

        match (email, password) {
            (Some(email), Some(password)) => v.finish(Credentials { email, password }),
            _ => Err(v.into_errors()),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct UserChanges {
    pub name: Option<UserName>,
    pub email: Option<Email>,
    pub password: Option<Password>,
    pub role: Option<Role>,
}

impl UpdateUserRequest {
    pub fn validate(self) -> Result<UserChanges, ValidationErrors> {
        let mut v = Validator::new();
        let changes = UserChanges {
            name: v.optional("name", self.name, UserName::parse),
            email: v.optional("email", self.email, Email::parse),
            password: v.optional("password", self.password, Password::parse),
            role: v.optional("role", self.role, |raw: String| raw.parse::<Role>()),
        };
        v.finish(changes)
    }
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password.is_none() && self.role.is_none()
    }

    /// Hashes a supplied password so the result can be written as is.
    pub fn into_patch(self) -> Result<UserPatch, PasswordHashError> {
        let password_hash = self.password.as_ref().map(hash_password).transpose()?;
        Ok(UserPatch {
            name: self.name,
            email: self.email,
            password_hash,
            role: self.role,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<UserName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: UserName,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
}

impl NewUser {
    pub fn from_registration(registration: Registration) -> Result<Self, PasswordHashError> {
        let password_hash = hash_password(&registration.password)?;
        Ok(Self {
            name: registration.name,
            email: registration.email,
            password_hash,
            role: registration.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::password::verify_password;

    fn request() -> RegisterUserRequest {
        RegisterUserRequest {
            name: Some("Rosalind Franklin".into()),
            email: Some("Rosalind@Example.org".into()),
            password: Some("Helix1953".into()),
            role: None,
        }
    }

    #[test]
    fn registration_defaults_role_to_user() {
        let registration = request().validate().unwrap();
        assert_eq!(registration.role, Role::User);
        assert_eq!(registration.email.as_ref(), "rosalind@example.org");
    }

    #[test]
    fn registration_reports_every_invalid_field() {
        let errors = RegisterUserRequest {
            name: Some("   ".into()),
            email: Some("not-an-email".into()),
            password: Some("short".into()),
            role: Some("owner".into()),
        }
        .validate()
        .unwrap_err();
        let fields: Vec<&str> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "password", "role"]);
    }

    #[test]
    fn registration_checks_password_character_classes() {
        let mut request = request();
        request.password = Some("alllowercase1".into());
        let errors = request.validate().unwrap_err();
        assert_eq!(errors.errors()[0].field, "password");
        assert!(errors.errors()[0].message.contains("uppercase"));
    }

    #[test]
    fn new_user_stores_a_verifiable_hash() {
        let user = NewUser::from_registration(request().validate().unwrap()).unwrap();
        assert_ne!(user.password_hash, "Helix1953");
        assert!(verify_password("Helix1953", &user.password_hash));
    }

    #[test]
    fn login_only_requires_a_password() {
        let credentials = LoginRequest {
            email: Some(" ROSALIND@example.org".into()),
            password: Some("weak".into()),
        }
        .validate()
        .ok()
        .unwrap();
        assert_eq!(credentials.email.as_ref(), "rosalind@example.org");

        let errors = LoginRequest {
            email: Some("rosalind@example.org".into()),
            password: Some(String::new()),
        }
        .validate()
        .err()
        .unwrap();
        assert!(errors.contains("password"));
    }

    #[test]
    fn update_hashes_new_password() {
        let changes = UpdateUserRequest {
            password: Some("Replaced42".into()),
            ..UpdateUserRequest::default()
        }
        .validate()
        .unwrap();
        let patch = changes.into_patch().unwrap();
        assert!(verify_password("Replaced42", patch.password_hash.as_deref().unwrap()));
        assert_eq!(patch.name, None);
    }

    #[test]
    fn user_never_serializes_its_hash() {
        let user = User {
            id: DocumentId::parse("507f1f77bcf86cd799439011").unwrap(),
            name: UserName::parse("Rosalind").unwrap(),
            email: Email::parse("rosalind@example.org").unwrap(),
            password_hash: "$argon2id$v=19$secret".into(),
            role: Role::Admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "admin");
    }
}
