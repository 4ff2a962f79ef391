use crate::entities::user::Entity as User;
use sea_orm::entity::prelude::*;
use serde::Serialize;

/// An order is an open cart while `checkout_date` is null and a placed order afterwards.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub user_id: i32,
    pub billing_id: Option<i32>,
    pub shipping_id: Option<i32>,
    pub credit_card_id: Option<i32>,
    pub checkout_date: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn is_placed(&self) -> bool {
        self.checkout_date.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "User",
        from = "Column::UserId",
        to = "crate::entities::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "crate::entities::order_content::Entity")]
    OrderContent,
}

impl ActiveModelBehavior for ActiveModel {}

impl Related<crate::entities::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<crate::entities::order_content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderContent.def()
    }
}
