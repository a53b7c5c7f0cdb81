use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use vrl_common::entities::Entity;

use crate::domain::AppState;
use crate::domain::repository::EntityRepository;
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::extract::{AdminOnly, ApiJson};
use crate::infrastructure::http::querystring::QueryString;

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: String,
}

pub async fn list_entities<S: AppState, E: Entity>(
    State(state): State<S>,
    QueryString(params): QueryString<PageParams>,
    QueryString(query): QueryString<E::Query>,
) -> Result<ApiSuccess<Vec<E>>, ApiError> {
    let page = state.pagination().request(params.page, params.limit);
    let page = EntityRepository::<_, E>::new(state.store())
        .list(&query, page)
        .await?;
    Ok(ApiSuccess::page(page))
}

pub async fn get_entity<S: AppState, E: Entity>(
    State(state): State<S>,
    Path(id): Path<String>,
) -> Result<ApiSuccess<E>, ApiError> {
    EntityRepository::<_, E>::new(state.store())
        .get(&id)
        .await
        .map_err(ApiError::from)
        .map(|entity| ApiSuccess::new(StatusCode::OK, entity))
}

pub async fn create_entity<S: AppState, E: Entity>(
    State(state): State<S>,
    AdminOnly(_): AdminOnly,
    ApiJson(input): ApiJson<E::Input>,
) -> Result<ApiSuccess<E>, ApiError> {
    let entity = EntityRepository::<_, E>::new(state.store())
        .create(input)
        .await?;
    Ok(ApiSuccess::with_message(
        StatusCode::CREATED,
        entity,
        format!("{} created", E::NAME),
    ))
}

pub async fn update_entity<S: AppState, E: Entity>(
    State(state): State<S>,
    Path(id): Path<String>,
    AdminOnly(_): AdminOnly,
    ApiJson(input): ApiJson<E::Input>,
) -> Result<ApiSuccess<E>, ApiError> {
    let entity = EntityRepository::<_, E>::new(state.store())
        .update(&id, input)
        .await?;
    Ok(ApiSuccess::with_message(
        StatusCode::OK,
        entity,
        format!("{} updated", E::NAME),
    ))
}

pub async fn delete_entity<S: AppState, E: Entity>(
    State(state): State<S>,
    Path(id): Path<String>,
    AdminOnly(_): AdminOnly,
) -> Result<ApiSuccess<Deleted>, ApiError> {
    EntityRepository::<_, E>::new(state.store())
        .delete(&id)
        .await?;
    Ok(ApiSuccess::with_message(
        StatusCode::OK,
        Deleted { id },
        format!("{} deleted", E::NAME),
    ))
}
