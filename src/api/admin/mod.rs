pub mod analytics;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use analytics::analytics_router;

pub fn admin_api_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new().merge(analytics_router(db))
}
