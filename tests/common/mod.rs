#![allow(dead_code)]

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};

use shop_admin::directory::{
    create_address, create_category, create_credit_card, create_product, create_user,
    set_default_addresses, NewAddress, NewCategory, NewCreditCard, NewProduct, NewUser,
};
use shop_admin::entities::{address, category, credit_card, order, product, setup_schema, user};
use shop_admin::lifecycle::{self, IncomingLine};

pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to connect to sqlite");
    setup_schema(&db).await.expect("Failed to create schema");
    db
}

/// A database file shared by a pool of several connections, for tests that
/// need real contention between transactions.
pub struct FileDb {
    pub db: DatabaseConnection,
    path: PathBuf,
}

impl FileDb {
    pub async fn open(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "shop-admin-{name}-{}-{}.db",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
        options
            .max_connections(8)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(options)
            .await
            .expect("Failed to open sqlite file");
        setup_schema(&db).await.expect("Failed to create schema");
        Self { db, path }
    }

    pub async fn close(self) {
        self.db.close().await.expect("Failed to close pool");
        for suffix in ["", "-journal", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", self.path.display()));
        }
    }
}

pub struct Customer {
    pub user: user::Model,
    pub address: address::Model,
    pub card: credit_card::Model,
}

/// A user with one address used for billing and shipping, and one credit card.
pub async fn customer(db: &DatabaseConnection, first: &str, last: &str, state: &str) -> Customer {
    let user = create_user(
        db,
        NewUser {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
        },
    )
    .await
    .expect("Failed to create user");

    let address = create_address(
        db,
        NewAddress {
            user_id: user.id,
            street_address: "1 Main Street".to_string(),
            city: "Springfield".to_string(),
            state: state.to_string(),
            zip_code: "12345".to_string(),
        },
    )
    .await
    .expect("Failed to create address");

    let user = set_default_addresses(db, user.id, Some(address.id), Some(address.id))
        .await
        .expect("Failed to set default addresses");

    let card = create_credit_card(
        db,
        NewCreditCard {
            user_id: user.id,
            card_number: "4111111111111111".to_string(),
            exp_month: 1,
            exp_year: 2030,
        },
    )
    .await
    .expect("Failed to create credit card");

    Customer {
        user,
        address,
        card,
    }
}

pub async fn category(db: &DatabaseConnection) -> category::Model {
    create_category(
        db,
        NewCategory {
            name: "Bakery".to_string(),
            description: "Bread and pastries".to_string(),
        },
    )
    .await
    .expect("Failed to create category")
}

pub async fn product(
    db: &DatabaseConnection,
    category_id: i32,
    name: &str,
    price: i64,
) -> product::Model {
    create_product(
        db,
        NewProduct {
            name: name.to_string(),
            description: format!("{name} description"),
            price: Decimal::from(price),
            category_id,
        },
    )
    .await
    .expect("Failed to create product")
}

/// Builds a cart from `lines`, places it and moves its checkout date to `at`.
pub async fn placed_order(
    db: &DatabaseConnection,
    user_id: i32,
    lines: &[(i32, i32)],
    at: DateTime<Utc>,
) -> order::Model {
    let items: Vec<IncomingLine> = lines
        .iter()
        .map(|(product_id, quantity)| IncomingLine::new(*product_id, *quantity))
        .collect();
    let cart = lifecycle::merge_cart(db, user_id, &items)
        .await
        .expect("Failed to fill cart");
    lifecycle::place_order(db, cart.id)
        .await
        .expect("Failed to place order");
    set_checkout_date(db, cart.id, Some(at)).await
}

pub async fn set_checkout_date(
    db: &DatabaseConnection,
    order_id: i32,
    at: Option<DateTime<Utc>>,
) -> order::Model {
    let order = find_order(db, order_id).await;
    let mut active: order::ActiveModel = order.into();
    active.checkout_date = Set(at);
    active.update(db).await.expect("Failed to update order")
}

pub async fn set_user_created_at(db: &DatabaseConnection, user_id: i32, at: DateTime<Utc>) {
    let user = user::Entity::find_by_id(user_id)
        .one(db)
        .await
        .expect("Failed to query user")
        .expect("User not found");
    let mut active: user::ActiveModel = user.into();
    active.created_at = Set(at);
    active.update(db).await.expect("Failed to update user");
}

pub async fn find_order(db: &DatabaseConnection, order_id: i32) -> order::Model {
    order::Entity::find_by_id(order_id)
        .one(db)
        .await
        .expect("Failed to query order")
        .expect("Order not found")
}
