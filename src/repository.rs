//! Typed read access to the store for order valuation and analytics.
//!
//! The aggregation code only sees [`ShopRepository`]; [`SeaOrmRepository`] is the
//! implementation backed by the relational store.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::entity::prelude::{DateTimeUtc, Decimal};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};

use crate::entities::{address, order, order_content, product, state, user};

/// One order line joined with the live product name and price.
#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct LineItemRow {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl LineItemRow {
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.price
    }
}

#[async_trait]
pub trait ShopRepository: Send + Sync {
    async fn find_order(&self, order_id: i32) -> Result<Option<order::Model>, DbErr>;

    async fn find_user(&self, user_id: i32) -> Result<Option<user::Model>, DbErr>;

    async fn find_users(&self, user_ids: &[i32]) -> Result<Vec<user::Model>, DbErr>;

    /// All orders, or only those of one user, by ascending id.
    async fn orders(&self, user_id: Option<i32>) -> Result<Vec<order::Model>, DbErr>;

    /// Lines of the given orders by ascending line id.
    async fn line_items(&self, order_ids: &[i32]) -> Result<Vec<LineItemRow>, DbErr>;

    /// Placed orders whose checkout date is at or after `since` (all placed orders when `None`).
    async fn placed_orders_since(
        &self,
        since: Option<DateTimeUtc>,
    ) -> Result<Vec<order::Model>, DbErr>;

    /// Lines belonging to the orders [`ShopRepository::placed_orders_since`] returns.
    async fn placed_line_items_since(
        &self,
        since: Option<DateTimeUtc>,
    ) -> Result<Vec<LineItemRow>, DbErr>;

    async fn count_placed_orders_since(&self, since: Option<DateTimeUtc>) -> Result<u64, DbErr>;

    async fn count_users_since(&self, since: Option<DateTimeUtc>) -> Result<u64, DbErr>;

    async fn count_products_since(&self, since: Option<DateTimeUtc>) -> Result<u64, DbErr>;

    /// State name of every user's default billing address, one entry per user.
    async fn billing_states(&self) -> Result<Vec<String>, DbErr>;
}

#[derive(Clone, Debug)]
pub struct SeaOrmRepository {
    db: DatabaseConnection,
}

impl SeaOrmRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn line_item_query() -> sea_orm::Select<order_content::Entity> {
    order_content::Entity::find()
        .select_only()
        .column(order_content::Column::Id)
        .column(order_content::Column::OrderId)
        .column(order_content::Column::ProductId)
        .column(order_content::Column::Quantity)
        .column_as(product::Column::Name, "product_name")
        .column_as(product::Column::Price, "price")
        .join(JoinType::InnerJoin, order_content::Relation::Product.def())
        .order_by_asc(order_content::Column::Id)
}

fn placed_since(since: Option<DateTimeUtc>) -> Condition {
    let condition = Condition::all().add(order::Column::CheckoutDate.is_not_null());
    match since {
        Some(since) => condition.add(order::Column::CheckoutDate.gte(since)),
        None => condition,
    }
}

#[async_trait]
impl ShopRepository for SeaOrmRepository {
    async fn find_order(&self, order_id: i32) -> Result<Option<order::Model>, DbErr> {
        order::Entity::find_by_id(order_id).one(&self.db).await
    }

    async fn find_user(&self, user_id: i32) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find_by_id(user_id).one(&self.db).await
    }

    async fn find_users(&self, user_ids: &[i32]) -> Result<Vec<user::Model>, DbErr> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }
        user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids.iter().copied()))
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await
    }

    async fn orders(&self, user_id: Option<i32>) -> Result<Vec<order::Model>, DbErr> {
        let mut finder = order::Entity::find();
        if let Some(user_id) = user_id {
            finder = finder.filter(order::Column::UserId.eq(user_id));
        }
        finder.order_by_asc(order::Column::Id).all(&self.db).await
    }

    async fn line_items(&self, order_ids: &[i32]) -> Result<Vec<LineItemRow>, DbErr> {
        if order_ids.is_empty() {
            return Ok(vec![]);
        }
        line_item_query()
            .filter(order_content::Column::OrderId.is_in(order_ids.iter().copied()))
            .into_model::<LineItemRow>()
            .all(&self.db)
            .await
    }

    async fn placed_orders_since(
        &self,
        since: Option<DateTimeUtc>,
    ) -> Result<Vec<order::Model>, DbErr> {
        order::Entity::find()
            .filter(placed_since(since))
            .order_by_asc(order::Column::Id)
            .all(&self.db)
            .await
    }

    async fn placed_line_items_since(
        &self,
        since: Option<DateTimeUtc>,
    ) -> Result<Vec<LineItemRow>, DbErr> {
        line_item_query()
            .join(JoinType::InnerJoin, order_content::Relation::Order.def())
            .filter(placed_since(since))
            .into_model::<LineItemRow>()
            .all(&self.db)
            .await
    }

    async fn count_placed_orders_since(&self, since: Option<DateTimeUtc>) -> Result<u64, DbErr> {
        order::Entity::find()
            .filter(placed_since(since))
            .count(&self.db)
            .await
    }

    async fn count_users_since(&self, since: Option<DateTimeUtc>) -> Result<u64, DbErr> {
        let mut finder = user::Entity::find();
        if let Some(since) = since {
            finder = finder.filter(user::Column::CreatedAt.gte(since));
        }
        finder.count(&self.db).await
    }

    async fn count_products_since(&self, since: Option<DateTimeUtc>) -> Result<u64, DbErr> {
        let mut finder = product::Entity::find();
        if let Some(since) = since {
            finder = finder.filter(product::Column::CreatedAt.gte(since));
        }
        finder.count(&self.db).await
    }

    async fn billing_states(&self) -> Result<Vec<String>, DbErr> {
        let billing_ids: Vec<i32> = user::Entity::find()
            .filter(user::Column::BillingId.is_not_null())
            .all(&self.db)
            .await?
            .into_iter()
            .filter_map(|user| user.billing_id)
            .collect();
        if billing_ids.is_empty() {
            return Ok(vec![]);
        }

        let state_by_address: HashMap<i32, String> = address::Entity::find()
            .filter(address::Column::Id.is_in(billing_ids.iter().copied()))
            .find_also_related(state::Entity)
            .all(&self.db)
            .await?
            .into_iter()
            .filter_map(|(address, state)| state.map(|state| (address.id, state.name)))
            .collect();

        Ok(billing_ids
            .iter()
            .filter_map(|id| state_by_address.get(id).cloned())
            .collect())
    }
}
