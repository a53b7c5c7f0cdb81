use axum::http::StatusCode;

pub mod entities;
pub mod singletons;
pub mod users;

// health check handler
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}
