pub mod address;
pub mod category;
pub mod city;
pub mod credit_card;
pub mod order;
pub mod order_content;
pub mod product;
pub mod state;
pub mod user;

use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};

/// Creates every table the shop needs, skipping the ones that already exist.
///
/// Lookup tables come first so the foreign keys of the later tables resolve on
/// backends that check them at creation time.
pub async fn setup_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, state::Entity).await?;
    create_table(db, &schema, city::Entity).await?;
    create_table(db, &schema, category::Entity).await?;
    create_table(db, &schema, product::Entity).await?;
    create_table(db, &schema, user::Entity).await?;
    create_table(db, &schema, address::Entity).await?;
    create_table(db, &schema, credit_card::Entity).await?;
    create_table(db, &schema, order::Entity).await?;
    create_table(db, &schema, order_content::Entity).await?;

    Ok(())
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(db.get_database_backend().build(&statement))
        .await
        .map(|_| ())
}
