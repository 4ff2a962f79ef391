pub mod admin;
pub mod user;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::ShopError;
use crate::middleware::logging::{logging_middleware, to_response, ApiOutcome};
use crate::repository::SeaOrmRepository;
use admin::admin_api_router;
use user::user_api_router;

pub fn create_api_router(shared_db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .nest("/api", user_api_router(shared_db.clone()))
        .nest("/api/admin", admin_api_router(shared_db))
        .layer(axum::middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}

pub(crate) fn repository(db: &DatabaseConnection) -> SeaOrmRepository {
    SeaOrmRepository::new(db.clone())
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let (status, outcome) = match &self {
            ShopError::Validation { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiOutcome::Rejected(self.to_string()),
            ),
            ShopError::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                ApiOutcome::Rejected(self.to_string()),
            ),
            ShopError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiOutcome::Failed(self.to_string()),
            ),
        };

        let body = match &self {
            ShopError::Database(_) => json!({ "error": "Internal server error" }),
            ShopError::Validation { field, message } => json!({
                "error": message,
                "field": field,
            }),
            ShopError::NotFound { .. } => json!({ "error": self.to_string() }),
        };

        to_response((status, Json(body)), outcome)
    }
}
