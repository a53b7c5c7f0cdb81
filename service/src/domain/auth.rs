use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use vrl_common::{Role, entities::user::User};

/// Bearer token payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// user id
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("failed to issue token: {0}")]
    Issue(String),
}

/// Issues and verifies HS256 signed bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.to_string(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Issue(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("rejected token: {}", e);
                AuthError::InvalidToken
            })
    }
}

#[cfg(test)]
mod tests {
    use vrl_common::{DocumentId, Email, UserName};

    use super::*;

    fn user(role: Role) -> User {
        User {
            id: DocumentId::parse("507f1f77bcf86cd799439011").unwrap(),
            name: UserName::parse("Ada").unwrap(),
            email: Email::parse("ada@vrl.org").unwrap(),
            password_hash: String::new(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_verifies_with_the_same_secret() {
        let tokens = TokenService::new("test-secret", 60);
        let token = tokens.issue(&user(Role::Admin)).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "507f1f77bcf86cd799439011");
        assert!(claims.is_admin());
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let token = TokenService::new("one", 60).issue(&user(Role::User)).unwrap();
        let result = TokenService::new("two", 60).verify(&token);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = TokenService::new("test-secret", -10);
        let token = tokens.issue(&user(Role::User)).unwrap();
        assert!(matches!(tokens.verify(&token), Err(AuthError::InvalidToken)));
    }
}
