use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use tracing::info;

use crate::db::entities::ingredient;

#[derive(Debug, thiserror::Error)]
pub enum IngredientServiceError {
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),
    #[error("Ingredient not found: {0}")]
    NotFound(i32),
    #[error("An ingredient with the name '{0}' already exists.")]
    DuplicateName(String),
}

/// Retrieves all ingredients owned by a user, ordered by name descending.
pub async fn get_ingredients_by_user_id(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<ingredient::Model>, DbErr> {
    ingredient::Entity::find()
        .filter(ingredient::Column::UserId.eq(user_id))
        .order_by_desc(ingredient::Column::Name)
        .all(db)
        .await
}

/// Renames an ingredient owned by `user_id`. `None` keeps the current name.
pub async fn update_ingredient(
    db: &DatabaseConnection,
    ingredient_id: i32,
    user_id: i32,
    name: Option<String>,
) -> Result<ingredient::Model, IngredientServiceError> {
    let existing = ingredient::Entity::find_by_id(ingredient_id)
        .filter(ingredient::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(IngredientServiceError::NotFound(ingredient_id))?;

    let Some(name) = name.filter(|name| *name != existing.name) else {
        return Ok(existing);
    };

    let mut active_ingredient: ingredient::ActiveModel = existing.into();
    active_ingredient.name = Set(name.clone());
    let updated = active_ingredient.update(db).await.map_err(|db_err| match db_err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => IngredientServiceError::DuplicateName(name),
        _ => IngredientServiceError::DbErr(db_err),
    })?;
    info!(ingredient_id, user_id, "Ingredient renamed.");
    Ok(updated)
}

/// Deletes an ingredient owned by `user_id`. Its recipe associations go with it.
pub async fn delete_ingredient(
    db: &DatabaseConnection,
    ingredient_id: i32,
    user_id: i32,
) -> Result<(), IngredientServiceError> {
    let result = ingredient::Entity::delete_many()
        .filter(ingredient::Column::Id.eq(ingredient_id))
        .filter(ingredient::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(IngredientServiceError::NotFound(ingredient_id));
    }
    info!(ingredient_id, user_id, "Ingredient deleted.");
    Ok(())
}
