//! Schema bootstrap.
//!
//! Creates every table from its entity definition plus the `(user_id, name)`
//! unique indexes that make tag and ingredient get-or-create atomic. Safe to
//! run repeatedly.

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};
use tracing::info;

use crate::db::entities::{ingredient, recipe, recipe_ingredient, recipe_tag, tag, user};

pub async fn create_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    create_table(db, &schema, user::Entity).await?;
    create_table(db, &schema, tag::Entity).await?;
    create_table(db, &schema, ingredient::Entity).await?;
    create_table(db, &schema, recipe::Entity).await?;
    create_table(db, &schema, recipe_tag::Entity).await?;
    create_table(db, &schema, recipe_ingredient::Entity).await?;

    let unique_indexes = [
        owner_name_index("idx_tags_user_id_name", tag::Entity, tag::Column::UserId, tag::Column::Name),
        owner_name_index(
            "idx_ingredients_user_id_name",
            ingredient::Entity,
            ingredient::Column::UserId,
            ingredient::Column::Name,
        ),
    ];
    for index in unique_indexes {
        db.execute(backend.build(&index)).await?;
    }

    info!("Database schema is up to date.");
    Ok(())
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(db.get_database_backend().build(&stmt)).await?;
    Ok(())
}

fn owner_name_index<E, C>(name: &str, entity: E, owner_column: C, name_column: C) -> IndexCreateStatement
where
    E: EntityTrait + 'static,
    C: sea_orm::ColumnTrait + 'static,
{
    Index::create()
        .if_not_exists()
        .name(name)
        .table(entity)
        .col(owner_column)
        .col(name_column)
        .unique()
        .to_owned()
}
