use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::analytics::{bucket_label, Analytics, Bucket, MAX_SERIES_LENGTH};
use crate::api::repository;
use crate::error::ShopError;
use crate::middleware::logging::{to_response, ApiOutcome};

const DEFAULT_SERIES_LENGTH: u32 = 7;
const MAX_WINDOW_DAYS: u32 = 36_600;

//ROUTERS
pub fn analytics_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/analytics/totals", get(get_totals))
        .route("/analytics/superlatives", get(get_superlatives))
        .route("/analytics/orders_by_day", get(get_orders_by_day))
        .route("/analytics/orders_by_week", get(get_orders_by_week))
        .layer(Extension(db))
}

//ROUTES
async fn get_dashboard(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ShopError> {
    let dashboard = Analytics::new(repository(&db)).dashboard().await?;
    Ok(to_response((StatusCode::OK, Json(dashboard)), ApiOutcome::Ok))
}

async fn get_totals(
    Query(query): Query<WindowQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ShopError> {
    let totals = Analytics::new(repository(&db)).totals(query.days()?).await?;
    Ok(to_response((StatusCode::OK, Json(totals)), ApiOutcome::Ok))
}

async fn get_superlatives(
    Query(query): Query<WindowQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ShopError> {
    let superlatives = Analytics::new(repository(&db))
        .superlatives(query.days()?)
        .await?;
    Ok(to_response((StatusCode::OK, Json(superlatives)), ApiOutcome::Ok))
}

async fn get_orders_by_day(
    Query(query): Query<SeriesQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ShopError> {
    let now = Utc::now();
    let n = query.length()?;
    let buckets = Analytics::at(repository(&db), now).orders_by_day(n).await?;
    let today = now.date_naive();
    let series: Vec<SeriesEntry> = buckets
        .into_iter()
        .map(|bucket| SeriesEntry::labelled(bucket, today))
        .collect();
    Ok(to_response((StatusCode::OK, Json(series)), ApiOutcome::Ok))
}

async fn get_orders_by_week(
    Query(query): Query<SeriesQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ShopError> {
    let n = query.length()?;
    let buckets = Analytics::new(repository(&db)).orders_by_week(n).await?;
    let series: Vec<SeriesEntry> = buckets
        .into_iter()
        .map(|bucket| SeriesEntry {
            label: bucket.start.format("%m/%d").to_string(),
            date: bucket.start,
            order_count: bucket.order_count,
            revenue: bucket.revenue,
        })
        .collect();
    Ok(to_response((StatusCode::OK, Json(series)), ApiOutcome::Ok))
}

//Structs
#[derive(Deserialize)]
struct WindowQuery {
    days: Option<u32>,
}

#[derive(Deserialize)]
struct SeriesQuery {
    n: Option<u32>,
}

impl WindowQuery {
    fn days(&self) -> Result<Option<u32>, ShopError> {
        match self.days {
            Some(days) if days > MAX_WINDOW_DAYS => Err(ShopError::rule(
                "days",
                format!("days must be at most {MAX_WINDOW_DAYS}"),
            )),
            days => Ok(days),
        }
    }
}

impl SeriesQuery {
    fn length(&self) -> Result<u32, ShopError> {
        let n = self.n.unwrap_or(DEFAULT_SERIES_LENGTH);
        if n > MAX_SERIES_LENGTH {
            return Err(ShopError::rule(
                "n",
                format!("n must be at most {MAX_SERIES_LENGTH}"),
            ));
        }
        Ok(n)
    }
}

#[derive(Serialize)]
struct SeriesEntry {
    date: NaiveDate,
    label: String,
    order_count: u64,
    revenue: Decimal,
}

impl SeriesEntry {
    fn labelled(bucket: Bucket, today: NaiveDate) -> Self {
        Self {
            label: bucket_label(bucket.start, today),
            date: bucket.start,
            order_count: bucket.order_count,
            revenue: bucket.revenue,
        }
    }
}
