use std::fmt;
use std::str::FromStr;

use nutype::nutype;
use serde::{Deserialize, Serialize};

pub mod entities;
pub mod password;
pub mod persistence;
pub mod validation;

pub const USER_NAME_MAX_LENGTH: usize = 100;
pub const PASSWORD_MIN_LENGTH: usize = 8;

// A store identifier is the lowercase hex form of a 12 byte ObjectId.
#[nutype(
    sanitize(trim, lowercase),
    validate(regex = r"^[0-9a-f]{24}$"),
    derive(
        Clone,
        Debug,
        Display,
        FromStr,
        AsRef,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize
    )
)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, String> {
        Self::try_new(raw.into())
            .map_err(|_| "must be a 24-character hexadecimal identifier".to_owned())
    }
}

#[nutype(
    sanitize(trim, lowercase),
    validate(not_empty, regex = r"^[a-z0-9._%+-]+@[a-z0-9-]+(\.[a-z0-9-]+)*\.[a-z]{2,}$"),
    derive(
        Clone,
        Debug,
        Display,
        FromStr,
        AsRef,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize
    )
)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: impl Into<String>) -> Result<Self, String> {
        Self::try_new(raw.into()).map_err(|err| match err {
            EmailError::NotEmptyViolated => "is required".to_owned(),
            EmailError::RegexViolated => "must be a valid email address".to_owned(),
        })
    }
}

#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 100),
    derive(
        Clone,
        Debug,
        Display,
        AsRef,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize
    )
)]
pub struct UserName(String);

impl UserName {
    pub fn parse(raw: impl Into<String>) -> Result<Self, String> {
        Self::try_new(raw.into()).map_err(|err| match err {
            UserNameError::NotEmptyViolated => "must not be empty".to_owned(),
            UserNameError::LenCharMaxViolated => {
                format!("must be at most {USER_NAME_MAX_LENGTH} characters")
            }
        })
    }
}

/// Plaintext password accepted at registration. It is hashed before it
/// reaches the store and is never serialized.
#[nutype(
    validate(len_char_min = 8, predicate = has_required_character_classes),
    derive(Clone, AsRef)
)]
pub struct Password(String);

impl Password {
    pub fn parse(raw: impl Into<String>) -> Result<Self, String> {
        let raw = raw.into();
        let missing = missing_character_classes(&raw);
        Self::try_new(raw).map_err(|err| match err {
            PasswordError::LenCharMinViolated => {
                format!("must be at least {PASSWORD_MIN_LENGTH} characters long")
            }
            PasswordError::PredicateViolated => {
                format!("must contain at least one {}", missing.join(", one "))
            }
        })
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

pub fn has_required_character_classes(password: &str) -> bool {
    missing_character_classes(password).is_empty()
}

fn missing_character_classes(password: &str) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        missing.push("lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        missing.push("uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("digit");
    }
    missing
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err("must be one of: admin, user".to_owned()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::User => f.write_str("user"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_accepts_24_hex_characters() {
        assert!(DocumentId::parse("507f1f77bcf86cd799439011").is_ok());
        assert_eq!(
            DocumentId::parse(" 507F1F77BCF86CD799439011 ").unwrap(),
            DocumentId::parse("507f1f77bcf86cd799439011").unwrap()
        );
    }

    #[test]
    fn document_id_rejects_malformed_values() {
        assert!(DocumentId::parse("not-an-id").is_err());
        assert!(DocumentId::parse("507f1f77bcf86cd79943901").is_err());
        assert!(DocumentId::parse("507f1f77bcf86cd7994390112").is_err());
        assert!(DocumentId::parse("").is_err());
    }

    #[test]
    fn emails_differing_by_case_normalize_identically() {
        let lower = Email::parse("jane.doe@institute.org").unwrap();
        let mixed = Email::parse("  Jane.Doe@Institute.ORG ").unwrap();
        assert_eq!(lower, mixed);
        assert_eq!(mixed.as_ref(), "jane.doe@institute.org");
    }

    #[test]
    fn email_rejects_bad_grammar() {
        assert_eq!(
            Email::parse("jane.doe").unwrap_err(),
            "must be a valid email address"
        );
        assert_eq!(Email::parse("   ").unwrap_err(), "is required");
        assert!(Email::parse("jane@institute").is_err());
    }

    #[test]
    fn user_name_is_trimmed_and_bounded() {
        assert_eq!(UserName::parse("  Ada ").unwrap().as_ref(), "Ada");
        assert!(UserName::parse("   ").is_err());
        assert!(UserName::parse("x".repeat(101)).is_err());
        assert!(UserName::parse("x".repeat(100)).is_ok());
    }

    #[test]
    fn password_requires_length_and_character_classes() {
        assert!(Password::parse("Secret123").is_ok());
        assert_eq!(
            Password::parse("Sec1").unwrap_err(),
            "must be at least 8 characters long"
        );
        assert_eq!(
            Password::parse("secret123").unwrap_err(),
            "must contain at least one uppercase letter"
        );
        assert_eq!(
            Password::parse("SECRETSECRET").unwrap_err(),
            "must contain at least one lowercase letter, one digit"
        );
    }

    #[test]
    fn password_debug_does_not_leak() {
        let password = Password::parse("Secret123").unwrap();
        assert_eq!(format!("{password:?}"), "Password(***)");
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" user ".parse::<Role>(), Ok(Role::User));
        assert!("root".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::User);
    }
}
