//! Cart and order state transitions.
//!
//! An order is either an open cart (`checkout_date` null) or placed. Every
//! transition runs in one transaction that first locks the owning user's row,
//! so two requests for the same user cannot both open a cart.

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::entities::{address, credit_card, order, order_content, product, user};
use crate::error::ShopError;

/// The references an order write carries and that must belong to the order's user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct OrderRefs {
    pub billing_id: Option<i32>,
    pub shipping_id: Option<i32>,
    pub credit_card_id: Option<i32>,
}

impl OrderRefs {
    pub fn of(order: &order::Model) -> Self {
        Self {
            billing_id: order.billing_id,
            shipping_id: order.shipping_id,
            credit_card_id: order.credit_card_id,
        }
    }
}

/// A loosely typed value from an anonymous cart, either a number or text.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Text(String),
}

impl Scalar {
    fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }
}

/// One `(product_id, quantity)` pair from an anonymous cart.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct IncomingLine {
    pub product_id: Scalar,
    pub quantity: Scalar,
}

impl IncomingLine {
    pub fn new(product_id: i32, quantity: i32) -> Self {
        Self {
            product_id: Scalar::Int(product_id.into()),
            quantity: Scalar::Int(quantity.into()),
        }
    }

    pub fn raw(product_id: &str, quantity: &str) -> Self {
        Self {
            product_id: Scalar::Text(product_id.to_owned()),
            quantity: Scalar::Text(quantity.to_owned()),
        }
    }

    /// `(product_id, quantity)` when the product id is present and the
    /// quantity is a positive integer.
    pub fn coerce(&self) -> Option<(i32, i32)> {
        if self.product_id.is_blank() {
            return None;
        }
        let product_id = i32::try_from(self.product_id.as_int()?).ok()?;
        let quantity = i32::try_from(self.quantity.as_int()?).ok()?;
        (quantity > 0).then_some((product_id, quantity))
    }
}

/// Returns the user's open cart, creating an empty one with the user's default
/// addresses when none exists.
pub async fn get_or_create_cart(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<order::Model, ShopError> {
    let txn = db.begin().await?;
    let user = lock_user(&txn, user_id).await?;
    let cart = open_cart(&txn, &user).await?;
    txn.commit().await?;
    Ok(cart)
}

/// Folds an anonymous cart into the user's persisted cart. Entries with a
/// blank or unknown product, or a non-positive quantity, are skipped.
pub async fn merge_cart(
    db: &DatabaseConnection,
    user_id: i32,
    items: &[IncomingLine],
) -> Result<order::Model, ShopError> {
    let txn = db.begin().await?;
    let user = lock_user(&txn, user_id).await?;
    let cart = open_cart(&txn, &user).await?;

    let mut merged = 0;
    for item in items {
        let Some((product_id, quantity)) = item.coerce() else {
            warn!(user_id, ?item, "Skipping malformed cart entry");
            continue;
        };
        if product::Entity::find_by_id(product_id).one(&txn).await?.is_none() {
            warn!(
                user_id,
                product_id,
                "Skipping cart entry for unknown product"
            );
            continue;
        }
        if !add_line(&txn, cart.id, product_id, quantity).await? {
            warn!(
                user_id,
                product_id,
                quantity,
                "Skipping cart entry, quantity would overflow"
            );
            continue;
        }
        merged += 1;
    }

    txn.commit().await?;
    info!(
        user_id,
        order_id = cart.id,
        merged,
        skipped = items.len() - merged,
        "Merged cart"
    );
    Ok(cart)
}

/// Adds `quantity` of one product to the user's cart.
pub async fn add_to_cart(
    db: &DatabaseConnection,
    user_id: i32,
    product_id: i32,
    quantity: i32,
) -> Result<order::Model, ShopError> {
    if quantity <= 0 {
        return Err(ShopError::rule("quantity", "quantity must be greater than 0"));
    }

    let txn = db.begin().await?;
    let user = lock_user(&txn, user_id).await?;
    if product::Entity::find_by_id(product_id).one(&txn).await?.is_none() {
        return Err(ShopError::not_found("product", product_id));
    }
    let cart = open_cart(&txn, &user).await?;
    if !add_line(&txn, cart.id, product_id, quantity).await? {
        return Err(ShopError::invalid("quantity"));
    }
    txn.commit().await?;

    debug!(
        user_id,
        order_id = cart.id,
        product_id,
        quantity,
        "Added product to cart"
    );
    Ok(cart)
}

/// CART → PLACED. Placing an already placed order leaves its checkout date alone.
pub async fn place_order(
    db: &DatabaseConnection,
    order_id: i32,
) -> Result<order::Model, ShopError> {
    let txn = db.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    if order.is_placed() {
        return Ok(order);
    }

    validate_refs(&txn, order.user_id, &OrderRefs::of(&order), true).await?;

    let now = Utc::now();
    let mut active: order::ActiveModel = order.into();
    active.checkout_date = Set(Some(now));
    active.updated_at = Set(now);
    let placed = active.update(&txn).await?;
    txn.commit().await?;

    info!(order_id, user_id = placed.user_id, "Order placed");
    Ok(placed)
}

/// PLACED → CART, refused while the user has another open cart.
pub async fn reopen_cart(
    db: &DatabaseConnection,
    order_id: i32,
) -> Result<order::Model, ShopError> {
    let txn = db.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    if !order.is_placed() {
        return Ok(order);
    }

    let other_cart = order::Entity::find()
        .filter(order::Column::UserId.eq(order.user_id))
        .filter(order::Column::CheckoutDate.is_null())
        .filter(order::Column::Id.ne(order.id))
        .one(&txn)
        .await?;
    if other_cart.is_some() {
        warn!(
            order_id,
            user_id = order.user_id,
            "Refusing to reopen order, user has a cart"
        );
        return Err(ShopError::rule(
            "checkout_date",
            "user already has an unplaced order",
        ));
    }

    validate_refs(&txn, order.user_id, &OrderRefs::of(&order), false).await?;

    let mut active: order::ActiveModel = order.into();
    active.checkout_date = Set(None);
    active.updated_at = Set(Utc::now());
    let reopened = active.update(&txn).await?;
    txn.commit().await?;

    info!(
        order_id,
        user_id = reopened.user_id,
        "Order reopened as cart"
    );
    Ok(reopened)
}

/// Replaces the billing, shipping and payment references of an order.
pub async fn update_order_refs(
    db: &DatabaseConnection,
    order_id: i32,
    refs: OrderRefs,
) -> Result<order::Model, ShopError> {
    let txn = db.begin().await?;
    let order = lock_order(&txn, order_id).await?;

    validate_refs(&txn, order.user_id, &refs, order.is_placed()).await?;

    let mut active: order::ActiveModel = order.into();
    active.billing_id = Set(refs.billing_id);
    active.shipping_id = Set(refs.shipping_id);
    active.credit_card_id = Set(refs.credit_card_id);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    Ok(updated)
}

async fn lock_user<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<user::Model, ShopError> {
    touch_user(conn, user_id).await?;
    user::Entity::find_by_id(user_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| ShopError::not_found("user", user_id))
}

/// Locks the owner of the order, then reads the order again under that lock.
async fn lock_order<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<order::Model, ShopError> {
    touch_order(conn, order_id).await?;
    let order = find_order(conn, order_id).await?;
    lock_user(conn, order.user_id).await?;
    find_order(conn, order_id).await
}

/// SQLite drops `FOR UPDATE`, so each transaction opens with a write that
/// changes nothing. That takes the database write lock before anything is read,
/// and a competing transaction waits in the busy handler until the first commits.
async fn touch_user<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<(), DbErr> {
    user::Entity::update_many()
        .col_expr(user::Column::UpdatedAt, Expr::col(user::Column::UpdatedAt).into())
        .filter(user::Column::Id.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

async fn touch_order<C: ConnectionTrait>(conn: &C, order_id: i32) -> Result<(), DbErr> {
    order::Entity::update_many()
        .col_expr(order::Column::UpdatedAt, Expr::col(order::Column::UpdatedAt).into())
        .filter(order::Column::Id.eq(order_id))
        .exec(conn)
        .await?;
    Ok(())
}

async fn find_order<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<order::Model, ShopError> {
    order::Entity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ShopError::not_found("order", order_id))
}

async fn open_cart<C: ConnectionTrait>(
    conn: &C,
    user: &user::Model,
) -> Result<order::Model, ShopError> {
    let existing = order::Entity::find()
        .filter(order::Column::UserId.eq(user.id))
        .filter(order::Column::CheckoutDate.is_null())
        .order_by_asc(order::Column::Id)
        .one(conn)
        .await?;
    if let Some(cart) = existing {
        return Ok(cart);
    }

    let refs = OrderRefs {
        billing_id: user.billing_id,
        shipping_id: user.shipping_id,
        credit_card_id: None,
    };
    validate_refs(conn, user.id, &refs, false).await?;

    let now = Utc::now();
    let cart = order::ActiveModel {
        user_id: Set(user.id),
        billing_id: Set(refs.billing_id),
        shipping_id: Set(refs.shipping_id),
        credit_card_id: Set(None),
        checkout_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    debug!(user_id = user.id, order_id = cart.id, "Created cart");
    Ok(cart)
}

/// Increments the line for `product_id`, or inserts one. Returns `false`
/// without writing when the summed quantity does not fit in an `i32`.
async fn add_line<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
    product_id: i32,
    quantity: i32,
) -> Result<bool, ShopError> {
    let existing = order_content::Entity::find()
        .filter(order_content::Column::OrderId.eq(order_id))
        .filter(order_content::Column::ProductId.eq(product_id))
        .one(conn)
        .await?;

    match existing {
        Some(line) => {
            let Some(total) = line.quantity.checked_add(quantity) else {
                return Ok(false);
            };
            let mut line: order_content::ActiveModel = line.into();
            line.quantity = Set(total);
            line.update(conn).await?;
        }
        None => {
            order_content::ActiveModel {
                order_id: Set(order_id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(conn)
            .await?;
        }
    }
    Ok(true)
}

/// Billing and shipping addresses must belong to the user; so must the credit
/// card once the order is placed.
async fn validate_refs<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    refs: &OrderRefs,
    placed: bool,
) -> Result<(), ShopError> {
    if let Some(id) = refs.billing_id {
        if !owns_address(conn, user_id, id).await? {
            return Err(ShopError::invalid("billing_id"));
        }
    }
    if let Some(id) = refs.shipping_id {
        if !owns_address(conn, user_id, id).await? {
            return Err(ShopError::invalid("shipping_id"));
        }
    }
    if placed {
        if let Some(id) = refs.credit_card_id {
            if !owns_credit_card(conn, user_id, id).await? {
                return Err(ShopError::invalid("credit_card_id"));
            }
        }
    }
    Ok(())
}

pub(crate) async fn owns_address<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    address_id: i32,
) -> Result<bool, ShopError> {
    Ok(address::Entity::find_by_id(address_id)
        .filter(address::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .is_some())
}

async fn owns_credit_card<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    card_id: i32,
) -> Result<bool, ShopError> {
    Ok(credit_card::Entity::find_by_id(card_id)
        .filter(credit_card::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .is_some())
}
