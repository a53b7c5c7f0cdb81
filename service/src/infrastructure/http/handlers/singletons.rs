use axum::extract::State;
use axum::http::StatusCode;
use vrl_common::entities::Singleton;

use crate::domain::AppState;
use crate::domain::repository::SingletonRepository;
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::extract::{AdminOnly, ApiJson};

pub async fn get_singleton<S: AppState, T: Singleton>(
    State(state): State<S>,
) -> Result<ApiSuccess<T>, ApiError> {
    SingletonRepository::<_, T>::new(state.store())
        .get()
        .await
        .map_err(ApiError::from)
        .map(|content| ApiSuccess::new(StatusCode::OK, content))
}

pub async fn update_singleton<S: AppState, T: Singleton>(
    State(state): State<S>,
    AdminOnly(claims): AdminOnly,
    ApiJson(input): ApiJson<T::Input>,
) -> Result<ApiSuccess<T>, ApiError> {
    let content = SingletonRepository::<_, T>::new(state.store())
        .update(input)
        .await?;
    tracing::info!("{} updated by {}", T::NAME, claims.email);
    Ok(ApiSuccess::with_message(
        StatusCode::OK,
        content,
        format!("{} updated", T::NAME),
    ))
}
