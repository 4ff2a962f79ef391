pub mod cart;
pub mod order;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use cart::cart_router;
use order::order_router;

pub fn user_api_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .merge(cart_router(db.clone()))
        .merge(order_router(db))
}
