use axum::extract::{FromRequest, FromRequestParts, OptionalFromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::domain::AppState;
use crate::domain::auth::{AuthError, Claims};
use crate::infrastructure::http::api::ApiError;

/// JSON body whose rejections are reported in the API envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Caller holding a valid bearer token.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Claims);

/// Caller holding a valid bearer token with the admin role.
#[derive(Debug, Clone)]
pub struct AdminOnly(pub Claims);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AuthError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header.to_str().map_err(|_| AuthError::InvalidToken)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or(AuthError::InvalidToken)
}

impl<S: AppState> FromRequestParts<S> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AuthError::MissingToken)?;
        Ok(Self(state.tokens().verify(token)?))
    }
}

impl<S: AppState> OptionalFromRequestParts<S> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(Some(Self(state.tokens().verify(token)?))),
            None => Ok(None),
        }
    }
}

impl<S: AppState> FromRequestParts<S> for AdminOnly {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Authenticated(claims) =
            <Authenticated as FromRequestParts<S>>::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            return Err(AuthError::Forbidden("administrator role required").into());
        }
        Ok(Self(claims))
    }
}
