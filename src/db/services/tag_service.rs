use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use tracing::info;

use crate::db::entities::tag;

#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),
    #[error("Tag not found: {0}")]
    NotFound(i32),
    #[error("A tag with the name '{0}' already exists.")]
    DuplicateName(String),
}

/// Retrieves all tags owned by a user, ordered by name descending.
pub async fn get_tags_by_user_id(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<tag::Model>, DbErr> {
    tag::Entity::find()
        .filter(tag::Column::UserId.eq(user_id))
        .order_by_desc(tag::Column::Name)
        .all(db)
        .await
}

/// Renames a tag owned by `user_id`. `None` keeps the current name.
pub async fn update_tag(
    db: &DatabaseConnection,
    tag_id: i32,
    user_id: i32,
    name: Option<String>,
) -> Result<tag::Model, TagServiceError> {
    let existing = tag::Entity::find_by_id(tag_id)
        .filter(tag::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(TagServiceError::NotFound(tag_id))?;

    let Some(name) = name.filter(|name| *name != existing.name) else {
        return Ok(existing);
    };

    let mut active_tag: tag::ActiveModel = existing.into();
    active_tag.name = Set(name.clone());
    let updated = active_tag.update(db).await.map_err(|db_err| match db_err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => TagServiceError::DuplicateName(name),
        _ => TagServiceError::DbErr(db_err),
    })?;
    info!(tag_id, user_id, "Tag renamed.");
    Ok(updated)
}

/// Deletes a tag owned by `user_id`. Its recipe associations go with it.
pub async fn delete_tag(
    db: &DatabaseConnection,
    tag_id: i32,
    user_id: i32,
) -> Result<(), TagServiceError> {
    let result = tag::Entity::delete_many()
        .filter(tag::Column::Id.eq(tag_id))
        .filter(tag::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(TagServiceError::NotFound(tag_id));
    }
    info!(tag_id, user_id, "Tag deleted.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::services::reconcile_service::get_or_create_tag;
    use crate::test_support::{create_user, setup_db};

    #[tokio::test]
    async fn lists_own_tags_by_name_descending() {
        let db = setup_db().await;
        let user = create_user(&db, "a@example.com").await;
        let other = create_user(&db, "b@example.com").await;
        for name in ["breakfast", "vegan", "dinner"] {
            get_or_create_tag(&db, user.id, name).await.unwrap();
        }
        get_or_create_tag(&db, other.id, "zzz").await.unwrap();

        let names: Vec<String> = get_tags_by_user_id(&db, user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();

        assert_eq!(names, vec!["vegan", "dinner", "breakfast"]);
    }

    #[tokio::test]
    async fn rename_and_delete_own_tag() {
        let db = setup_db().await;
        let user = create_user(&db, "a@example.com").await;
        let tag = get_or_create_tag(&db, user.id, "desert").await.unwrap();

        let renamed = update_tag(&db, tag.id, user.id, Some("dessert".to_string()))
            .await
            .unwrap();
        assert_eq!(renamed.name, "dessert");

        let unchanged = update_tag(&db, tag.id, user.id, None).await.unwrap();
        assert_eq!(unchanged.name, "dessert");

        delete_tag(&db, tag.id, user.id).await.unwrap();
        assert!(get_tags_by_user_id(&db, user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_tag_is_not_found() {
        let db = setup_db().await;
        let owner = create_user(&db, "a@example.com").await;
        let intruder = create_user(&db, "b@example.com").await;
        let tag = get_or_create_tag(&db, owner.id, "dinner").await.unwrap();

        assert!(matches!(
            update_tag(&db, tag.id, intruder.id, Some("mine".to_string())).await,
            Err(TagServiceError::NotFound(id)) if id == tag.id
        ));
        assert!(matches!(
            delete_tag(&db, tag.id, intruder.id).await,
            Err(TagServiceError::NotFound(_))
        ));
        assert_eq!(get_tags_by_user_id(&db, owner.id).await.unwrap(), vec![tag]);
    }

    #[tokio::test]
    async fn rename_onto_existing_name_is_rejected() {
        let db = setup_db().await;
        let user = create_user(&db, "a@example.com").await;
        get_or_create_tag(&db, user.id, "dinner").await.unwrap();
        let lunch = get_or_create_tag(&db, user.id, "lunch").await.unwrap();

        let result = update_tag(&db, lunch.id, user.id, Some("dinner".to_string())).await;

        assert!(matches!(result, Err(TagServiceError::DuplicateName(name)) if name == "dinner"));
    }
}
