use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::user::order::OrderDetail;
use crate::api::repository;
use crate::error::ShopError;
use crate::lifecycle::{self, IncomingLine};
use crate::middleware::logging::{to_response, ApiOutcome};

//ROUTERS
pub fn cart_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/users/:id/cart", get(get_cart).post(add_product))
        .route("/users/:id/cart/merge", post(merge_cart))
        .layer(Extension(db))
}

//ROUTES
async fn get_cart(
    Path(user_id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ShopError> {
    let cart = lifecycle::get_or_create_cart(&db, user_id).await?;
    let detail = OrderDetail::load(&repository(&db), cart).await?;
    Ok(to_response((StatusCode::OK, Json(detail)), ApiOutcome::Ok))
}

async fn add_product(
    Path(user_id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<AddProduct>,
) -> Result<Response, ShopError> {
    let cart =
        lifecycle::add_to_cart(&db, user_id, payload.product_id, payload.quantity).await?;
    let detail = OrderDetail::load(&repository(&db), cart).await?;
    Ok(to_response((StatusCode::CREATED, Json(detail)), ApiOutcome::Ok))
}

async fn merge_cart(
    Path(user_id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<MergeCart>,
) -> Result<Response, ShopError> {
    let cart = lifecycle::merge_cart(&db, user_id, &payload.items).await?;
    let detail = OrderDetail::load(&repository(&db), cart).await?;
    Ok(to_response((StatusCode::OK, Json(detail)), ApiOutcome::Ok))
}

//Structs
#[derive(Deserialize, Debug)]
struct AddProduct {
    product_id: i32,
    quantity: i32,
}

#[derive(Deserialize, Debug)]
struct MergeCart {
    items: Vec<IncomingLine>,
}
