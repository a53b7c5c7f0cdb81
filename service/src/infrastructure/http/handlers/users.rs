use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use vrl_common::entities::user::{LoginRequest, RegisterUserRequest, UpdateUserRequest, User};

use crate::domain::AppState;
use crate::domain::auth::AuthError;
use crate::domain::repository::UserRepository;
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::extract::{AdminOnly, ApiJson, Authenticated};
use crate::infrastructure::http::handlers::entities::PageParams;
use crate::infrastructure::http::querystring::QueryString;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Open registration. Only an administrator may register another administrator.
pub async fn register<S: AppState>(
    State(state): State<S>,
    caller: Option<Authenticated>,
    ApiJson(request): ApiJson<RegisterUserRequest>,
) -> Result<ApiSuccess<User>, ApiError> {
    let registration = request.validate()?;
    let caller_is_admin = caller.is_some_and(|Authenticated(claims)| claims.is_admin());
    if registration.role.is_admin() && !caller_is_admin {
        return Err(AuthError::Forbidden("only administrators can register administrators").into());
    }

    let user = UserRepository::new(state.store())
        .register(registration)
        .await?;
    Ok(ApiSuccess::with_message(
        StatusCode::CREATED,
        user,
        "User registered",
    ))
}

pub async fn login<S: AppState>(
    State(state): State<S>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<ApiSuccess<LoginResponse>, ApiError> {
    let credentials = request.validate()?;
    let user = UserRepository::new(state.store())
        .verify_credentials(&credentials)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let token = state.tokens().issue(&user)?;
    tracing::info!("user {} logged in", user.id);
    Ok(ApiSuccess::new(StatusCode::OK, LoginResponse { token, user }))
}

pub async fn me<S: AppState>(
    State(state): State<S>,
    Authenticated(claims): Authenticated,
) -> Result<ApiSuccess<User>, ApiError> {
    UserRepository::new(state.store())
        .get(&claims.sub)
        .await
        .map_err(ApiError::from)
        .map(|user| ApiSuccess::new(StatusCode::OK, user))
}

pub async fn list_users<S: AppState>(
    State(state): State<S>,
    AdminOnly(_): AdminOnly,
    QueryString(params): QueryString<PageParams>,
) -> Result<ApiSuccess<Vec<User>>, ApiError> {
    let page = state.pagination().request(params.page, params.limit);
    let page = UserRepository::new(state.store()).list(page).await?;
    Ok(ApiSuccess::page(page))
}

/// Users edit their own account, administrators edit any account and roles.
pub async fn update_user<S: AppState>(
    State(state): State<S>,
    Path(id): Path<String>,
    Authenticated(claims): Authenticated,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<ApiSuccess<User>, ApiError> {
    if !claims.sub.eq_ignore_ascii_case(id.trim()) && !claims.is_admin() {
        return Err(AuthError::Forbidden("you can only update your own account").into());
    }
    let changes = request.validate()?;
    if changes.role.is_some() && !claims.is_admin() {
        return Err(AuthError::Forbidden("only administrators can change roles").into());
    }

    let user = UserRepository::new(state.store())
        .update(&id, changes)
        .await?;
    Ok(ApiSuccess::with_message(StatusCode::OK, user, "User updated"))
}
