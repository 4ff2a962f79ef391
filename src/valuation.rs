//! Monetary value, line items and status of a single order.
//!
//! Values are always computed from the current product prices; nothing is
//! snapshotted when an order is placed.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::entity::prelude::DateTimeUtc;
use serde::Serialize;

use crate::entities::order;
use crate::error::ShopError;
use crate::repository::{LineItemRow, ShopRepository};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Unplaced,
    Placed,
}

impl OrderStatus {
    pub fn of(order: &order::Model) -> Self {
        if order.is_placed() {
            Self::Placed
        } else {
            Self::Unplaced
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineItem {
    pub product_id: i32,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

impl From<LineItemRow> for LineItem {
    fn from(row: LineItemRow) -> Self {
        Self {
            line_total: money(row.line_total()),
            product_id: row.product_id,
            product_name: row.product_name,
            unit_price: row.price,
            quantity: row.quantity,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderSummary {
    pub order_id: i32,
    pub user_id: i32,
    pub status: OrderStatus,
    pub checkout_date: Option<DateTimeUtc>,
    pub value: Decimal,
}

/// Rounds a money amount to cents.
pub fn money(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}

/// Σ quantity × price over the rows; zero for no rows.
pub fn sum_lines<'a>(rows: impl IntoIterator<Item = &'a LineItemRow>) -> Decimal {
    money(rows.into_iter().map(LineItemRow::line_total).sum())
}

/// Sums rows per order id.
pub fn values_by_order(rows: &[LineItemRow]) -> HashMap<i32, Decimal> {
    let mut values: HashMap<i32, Decimal> = HashMap::new();
    for row in rows {
        *values.entry(row.order_id).or_default() += row.line_total();
    }
    values
}

/// Largest quantity first. Rows arrive by ascending id and the sort is stable,
/// so equal quantities keep insertion order.
pub fn rank_line_items(mut rows: Vec<LineItemRow>) -> Vec<LineItem> {
    rows.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    rows.into_iter().map(LineItem::from).collect()
}

async fn require_order<R>(repo: &R, order_id: i32) -> Result<order::Model, ShopError>
where
    R: ShopRepository + ?Sized,
{
    repo.find_order(order_id)
        .await?
        .ok_or_else(|| ShopError::not_found("order", order_id))
}

pub async fn value<R>(repo: &R, order_id: i32) -> Result<Decimal, ShopError>
where
    R: ShopRepository + ?Sized,
{
    let order = require_order(repo, order_id).await?;
    let rows = repo.line_items(&[order.id]).await?;
    Ok(sum_lines(&rows))
}

pub async fn line_items<R>(repo: &R, order_id: i32) -> Result<Vec<LineItem>, ShopError>
where
    R: ShopRepository + ?Sized,
{
    let order = require_order(repo, order_id).await?;
    let rows = repo.line_items(&[order.id]).await?;
    Ok(rank_line_items(rows))
}

pub async fn status<R>(repo: &R, order_id: i32) -> Result<OrderStatus, ShopError>
where
    R: ShopRepository + ?Sized,
{
    let order = require_order(repo, order_id).await?;
    Ok(OrderStatus::of(&order))
}

/// Admin order listing: every order, or only the orders of `user_id`.
pub async fn order_summaries<R>(
    repo: &R,
    user_id: Option<i32>,
) -> Result<Vec<OrderSummary>, ShopError>
where
    R: ShopRepository + ?Sized,
{
    if let Some(user_id) = user_id {
        if repo.find_user(user_id).await?.is_none() {
            return Err(ShopError::not_found("user", user_id));
        }
    }

    let orders = repo.orders(user_id).await?;
    let ids: Vec<i32> = orders.iter().map(|order| order.id).collect();
    let values = values_by_order(&repo.line_items(&ids).await?);

    Ok(orders
        .into_iter()
        .map(|order| OrderSummary {
            order_id: order.id,
            user_id: order.user_id,
            status: OrderStatus::of(&order),
            checkout_date: order.checkout_date,
            value: money(values.get(&order.id).copied().unwrap_or_default()),
        })
        .collect())
}
