//! Validated inserts for users, addresses, cards and the catalog, plus the demo seed.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::info;
use validator::{Validate, ValidationError};

use crate::entities::{address, category, city, credit_card, product, state, user};
use crate::error::ShopError;
use crate::lifecycle::{self, IncomingLine, OrderRefs};

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, max = 64))]
    pub first_name: String,
    #[validate(length(min = 1, max = 64))]
    pub last_name: String,
    #[validate(email, length(min = 1, max = 64))]
    pub email: String,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewAddress {
    pub user_id: i32,
    #[validate(length(min = 1, max = 64))]
    pub street_address: String,
    #[validate(length(min = 1, max = 64))]
    pub city: String,
    #[validate(length(min = 1, max = 64))]
    pub state: String,
    #[validate(length(min = 1, max = 16))]
    pub zip_code: String,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewCreditCard {
    pub user_id: i32,
    #[validate(length(min = 12, max = 19))]
    pub card_number: String,
    #[validate(range(min = 1, max = 12))]
    pub exp_month: i32,
    #[validate(range(min = 2000, max = 2100))]
    pub exp_year: i32,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub description: String,
    #[validate(custom(function = "non_negative"))]
    pub price: Decimal,
    pub category_id: i32,
}

fn non_negative(price: &Decimal) -> Result<(), ValidationError> {
    if *price < Decimal::ZERO {
        return Err(ValidationError::new("negative"));
    }
    Ok(())
}

pub async fn create_user<C: ConnectionTrait>(
    db: &C,
    payload: NewUser,
) -> Result<user::Model, ShopError> {
    payload.validate()?;

    let taken = user::Entity::find()
        .filter(user::Column::Email.eq(payload.email.as_str()))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(ShopError::rule("email", "email has already been taken"));
    }

    let now = Utc::now();
    let new_user = user::ActiveModel {
        first_name: Set(payload.first_name),
        last_name: Set(payload.last_name),
        email: Set(payload.email),
        billing_id: Set(None),
        shipping_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(new_user.insert(db).await?)
}

pub async fn create_address<C: ConnectionTrait>(
    db: &C,
    payload: NewAddress,
) -> Result<address::Model, ShopError> {
    payload.validate()?;
    require_user(db, payload.user_id).await?;

    let (state, city) = find_or_create_location(db, &payload.state, &payload.city).await?;
    let new_address = address::ActiveModel {
        user_id: Set(payload.user_id),
        street_address: Set(payload.street_address),
        city_id: Set(city.id),
        state_id: Set(state.id),
        zip_code: Set(payload.zip_code),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(new_address.insert(db).await?)
}

/// Points the user's default billing and shipping at addresses the user owns.
pub async fn set_default_addresses<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    billing_id: Option<i32>,
    shipping_id: Option<i32>,
) -> Result<user::Model, ShopError> {
    let user = require_user(db, user_id).await?;

    if let Some(id) = billing_id {
        if !lifecycle::owns_address(db, user_id, id).await? {
            return Err(ShopError::invalid("billing_id"));
        }
    }
    if let Some(id) = shipping_id {
        if !lifecycle::owns_address(db, user_id, id).await? {
            return Err(ShopError::invalid("shipping_id"));
        }
    }

    let mut active: user::ActiveModel = user.into();
    active.billing_id = Set(billing_id);
    active.shipping_id = Set(shipping_id);
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?)
}

pub async fn create_credit_card<C: ConnectionTrait>(
    db: &C,
    payload: NewCreditCard,
) -> Result<credit_card::Model, ShopError> {
    payload.validate()?;
    require_user(db, payload.user_id).await?;

    let card = credit_card::ActiveModel {
        user_id: Set(payload.user_id),
        card_number: Set(payload.card_number),
        exp_month: Set(payload.exp_month),
        exp_year: Set(payload.exp_year),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(card.insert(db).await?)
}

pub async fn create_category<C: ConnectionTrait>(
    db: &C,
    payload: NewCategory,
) -> Result<category::Model, ShopError> {
    payload.validate()?;

    let category = category::ActiveModel {
        name: Set(payload.name),
        description: Set(payload.description),
        ..Default::default()
    };
    Ok(category.insert(db).await?)
}

pub async fn create_product<C: ConnectionTrait>(
    db: &C,
    payload: NewProduct,
) -> Result<product::Model, ShopError> {
    payload.validate()?;
    if category::Entity::find_by_id(payload.category_id)
        .one(db)
        .await?
        .is_none()
    {
        return Err(ShopError::not_found("category", payload.category_id));
    }

    let now = Utc::now();
    let product = product::ActiveModel {
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        category_id: Set(payload.category_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(product.insert(db).await?)
}

async fn require_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<user::Model, ShopError> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| ShopError::not_found("user", user_id))
}

async fn find_or_create_location<C: ConnectionTrait>(
    db: &C,
    state_name: &str,
    city_name: &str,
) -> Result<(state::Model, city::Model), ShopError> {
    let state = match state::Entity::find()
        .filter(state::Column::Name.eq(state_name))
        .one(db)
        .await?
    {
        Some(state) => state,
        None => {
            state::ActiveModel {
                name: Set(state_name.to_owned()),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    let city = match city::Entity::find()
        .filter(city::Column::Name.eq(city_name))
        .filter(city::Column::StateId.eq(state.id))
        .one(db)
        .await?
    {
        Some(city) => city,
        None => {
            city::ActiveModel {
                name: Set(city_name.to_owned()),
                state_id: Set(state.id),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    Ok((state, city))
}

/// Fills an empty database with a small catalog, one customer and one placed order.
pub async fn seed_demo(db: &DatabaseConnection) -> Result<(), ShopError> {
    if user::Entity::find().count(db).await? > 0 {
        info!("Database already has users, skipping demo seed");
        return Ok(());
    }

    let txn = db.begin().await?;
    let pastries = create_category(
        &txn,
        NewCategory {
            name: "Pastries".to_string(),
            description: "Ring-shaped breads and friends".to_string(),
        },
    )
    .await?;

    let mut products = Vec::new();
    for (name, cents) in [("Baranki", 450), ("Sushki", 300), ("Bublik", 525)] {
        let product = create_product(
            &txn,
            NewProduct {
                name: name.to_string(),
                description: format!("Freshly baked {}", name.to_lowercase()),
                price: Decimal::new(cents, 2),
                category_id: pastries.id,
            },
        )
        .await?;
        products.push(product);
    }

    let customer = create_user(
        &txn,
        NewUser {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
        },
    )
    .await?;
    let home = create_address(
        &txn,
        NewAddress {
            user_id: customer.id,
            street_address: "12 Analytical Way".to_string(),
            city: "Austin".to_string(),
            state: "Texas".to_string(),
            zip_code: "73301".to_string(),
        },
    )
    .await?;
    set_default_addresses(&txn, customer.id, Some(home.id), Some(home.id)).await?;
    let card = create_credit_card(
        &txn,
        NewCreditCard {
            user_id: customer.id,
            card_number: "4111111111111111".to_string(),
            exp_month: 12,
            exp_year: 2030,
        },
    )
    .await?;
    txn.commit().await?;

    let lines: Vec<IncomingLine> = products
        .iter()
        .zip([2, 1, 3])
        .map(|(product, quantity)| IncomingLine::new(product.id, quantity))
        .collect();
    let cart = lifecycle::merge_cart(db, customer.id, &lines).await?;
    lifecycle::update_order_refs(
        db,
        cart.id,
        OrderRefs {
            billing_id: Some(home.id),
            shipping_id: Some(home.id),
            credit_card_id: Some(card.id),
        },
    )
    .await?;
    lifecycle::place_order(db, cart.id).await?;

    info!(
        user_id = customer.id,
        order_id = cart.id,
        "Seeded demo data"
    );
    Ok(())
}
