use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::repository;
use crate::entities::order;
use crate::error::ShopError;
use crate::lifecycle::{self, OrderRefs};
use crate::middleware::logging::{to_response, ApiOutcome};
use crate::repository::ShopRepository;
use crate::valuation::{self, LineItem, OrderStatus};

//ROUTERS
pub fn order_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order).patch(patch_order))
        .route("/orders/:id/place", post(place_order))
        .route("/orders/:id/reopen", post(reopen_order))
        .layer(Extension(db))
}

//ROUTES
async fn list_orders(
    Query(query): Query<OrdersQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ShopError> {
    let summaries = valuation::order_summaries(&repository(&db), query.user_id).await?;
    Ok(to_response((StatusCode::OK, Json(summaries)), ApiOutcome::Ok))
}

async fn get_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ShopError> {
    let repo = repository(&db);
    let order = repo
        .find_order(id)
        .await?
        .ok_or_else(|| ShopError::not_found("order", id))?;
    let detail = OrderDetail::load(&repo, order).await?;
    Ok(to_response((StatusCode::OK, Json(detail)), ApiOutcome::Ok))
}

async fn patch_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<OrderRefs>,
) -> Result<Response, ShopError> {
    let order = lifecycle::update_order_refs(&db, id, payload).await?;
    let detail = OrderDetail::load(&repository(&db), order).await?;
    Ok(to_response((StatusCode::OK, Json(detail)), ApiOutcome::Ok))
}

async fn place_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ShopError> {
    let order = lifecycle::place_order(&db, id).await?;
    let detail = OrderDetail::load(&repository(&db), order).await?;
    Ok(to_response((StatusCode::OK, Json(detail)), ApiOutcome::Ok))
}

async fn reopen_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ShopError> {
    let order = lifecycle::reopen_cart(&db, id).await?;
    let detail = OrderDetail::load(&repository(&db), order).await?;
    Ok(to_response((StatusCode::OK, Json(detail)), ApiOutcome::Ok))
}

//Structs
#[derive(Deserialize)]
struct OrdersQuery {
    user_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    order: order::Model,
    status: OrderStatus,
    value: Decimal,
    line_items: Vec<LineItem>,
}

impl OrderDetail {
    pub async fn load<R: ShopRepository>(repo: &R, order: order::Model) -> Result<Self, ShopError> {
        let rows = repo.line_items(&[order.id]).await?;
        Ok(Self {
            status: OrderStatus::of(&order),
            value: valuation::sum_lines(&rows),
            line_items: valuation::rank_line_items(rows),
            order,
        })
    }
}
