use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use vrl_common::validation::{FieldError, ValidationErrors};

use crate::domain::auth::AuthError;
use crate::domain::repository::{Page, RepositoryError};

// ApiSuccess is a wrapper around a response that includes a status code.

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize>(StatusCode, Json<ApiResponseBody<T>>);

impl<T: Serialize> ApiSuccess<T> {
    pub(crate) fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new_data(data)))
    }

    pub(crate) fn with_message(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        let mut body = ApiResponseBody::new_data(data);
        body.message = Some(message.into());
        ApiSuccess(status, Json(body))
    }
}

impl<T: Serialize> ApiSuccess<Vec<T>> {
    pub(crate) fn page(page: Page<T>) -> Self {
        let meta = PageMeta {
            page: page.page,
            limit: page.limit,
            total: page.total,
            total_pages: page.total_pages,
        };
        let mut body = ApiResponseBody::new_data(page.items);
        body.pagination = Some(meta);
        ApiSuccess(StatusCode::OK, Json(body))
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

// ApiError is a wrapper around a response that includes a status code.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    BadRequest(String),
    UnprocessableEntity(ValidationErrors),
    ConflictWithServerState(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::UnprocessableEntity(errors)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound(name) => Self::NotFound(format!("{name} not found")),
            RepositoryError::Validation(errors) => Self::UnprocessableEntity(errors),
            RepositoryError::Conflict(cause) => Self::ConflictWithServerState(cause),
            RepositoryError::Store(cause) => Self::InternalServerError(cause.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials | AuthError::MissingToken | AuthError::InvalidToken => {
                Self::Unauthorized(value.to_string())
            }
            AuthError::Forbidden(reason) => Self::Forbidden(reason.to_owned()),
            AuthError::Issue(cause) => Self::InternalServerError(cause),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => {
                Self::UnprocessableEntity(ValidationErrors::single("body", e.body_text()))
            }
            other => Self::BadRequest(other.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::UnprocessableEntity(ValidationErrors::single("query", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use ApiError::*;

        let (status, body) = match self {
            InternalServerError(e) => {
                tracing::error!("{}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponseBody::new_error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    ),
                )
            }
            BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ApiResponseBody::new_error(StatusCode::BAD_REQUEST, message),
            ),
            UnprocessableEntity(errors) => {
                let mut body = ApiResponseBody::new_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Validation failed".to_string(),
                );
                body.errors = Some(errors.into_errors());
                (StatusCode::UNPROCESSABLE_ENTITY, body)
            }
            ConflictWithServerState(message) => (
                StatusCode::CONFLICT,
                ApiResponseBody::new_error(StatusCode::CONFLICT, message),
            ),
            Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ApiResponseBody::new_error(StatusCode::UNAUTHORIZED, message),
            ),
            Forbidden(message) => (
                StatusCode::FORBIDDEN,
                ApiResponseBody::new_error(StatusCode::FORBIDDEN, message),
            ),
            NotFound(message) => (
                StatusCode::NOT_FOUND,
                ApiResponseBody::new_error(StatusCode::NOT_FOUND, message),
            ),
        };
        (status, Json(body)).into_response()
    }
}

// Generic response structure shared by all API responses.

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponseBody<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(flatten)]
    pub pagination: Option<PageMeta>,
}

impl<T: Serialize> ApiResponseBody<T> {
    pub fn new_data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            errors: None,
            pagination: None,
        }
    }
}

impl ApiResponseBody<()> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: status_code.canonical_reason().map(str::to_owned),
            message: Some(message),
            errors: None,
            pagination: None,
        }
    }
}

/// Paging details added next to `data` on list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn list_envelope_flattens_paging() {
        let body = ApiResponseBody {
            pagination: Some(PageMeta {
                page: 2,
                limit: 10,
                total: 11,
                total_pages: 2,
            }),
            ..ApiResponseBody::new_data(vec![1, 2])
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({ "success": true, "data": [1, 2], "page": 2, "limit": 10, "total": 11, "totalPages": 2 })
        );
    }

    #[test]
    fn error_envelope_omits_data() {
        let body = ApiResponseBody::new_error(StatusCode::NOT_FOUND, "Event not found".into());
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({ "success": false, "error": "Not Found", "message": "Event not found" })
        );
    }

    #[test]
    fn store_failures_are_opaque() {
        let error = ApiError::from(RepositoryError::Store(
            vrl_common::persistence::StoreError::Connection("mongodb://secret-host".into()),
        ));
        assert_eq!(
            error.clone().into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(matches!(error, ApiError::InternalServerError(_)));
    }
}
