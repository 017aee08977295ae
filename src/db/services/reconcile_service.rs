//! Resolves tag and ingredient names into owned rows and keeps a recipe's
//! association sets in line with the requested names.
//!
//! Get-or-create is a single "insert, do nothing on conflict" against the
//! `(user_id, name)` unique index followed by a fetch of that row, so two
//! requests racing on the same name always settle on one record.

use std::collections::BTreeSet;

use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};
use tracing::debug;

use crate::db::entities::{ingredient, recipe_ingredient, recipe_tag, tag};

/// Returns the user's tag called `name`, creating it first if needed.
pub async fn get_or_create_tag<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    name: &str,
) -> Result<tag::Model, DbErr> {
    let new_tag = tag::ActiveModel {
        user_id: Set(user_id),
        name: Set(name.to_owned()),
        ..Default::default()
    };
    let inserted = tag::Entity::insert(new_tag)
        .on_conflict(
            OnConflict::columns([tag::Column::UserId, tag::Column::Name])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    if inserted > 0 {
        debug!(user_id, name, "Created tag.");
    }

    tag::Entity::find()
        .filter(tag::Column::UserId.eq(user_id))
        .filter(tag::Column::Name.eq(name))
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("tag '{name}' for user {user_id}")))
}

/// Returns the user's ingredient called `name`, creating it first if needed.
pub async fn get_or_create_ingredient<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    name: &str,
) -> Result<ingredient::Model, DbErr> {
    let new_ingredient = ingredient::ActiveModel {
        user_id: Set(user_id),
        name: Set(name.to_owned()),
        ..Default::default()
    };
    let inserted = ingredient::Entity::insert(new_ingredient)
        .on_conflict(
            OnConflict::columns([ingredient::Column::UserId, ingredient::Column::Name])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    if inserted > 0 {
        debug!(user_id, name, "Created ingredient.");
    }

    ingredient::Entity::find()
        .filter(ingredient::Column::UserId.eq(user_id))
        .filter(ingredient::Column::Name.eq(name))
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("ingredient '{name}' for user {user_id}")))
}

/// Resolves every name and links the resulting tags to the recipe.
/// Repeated names collapse to one association.
pub async fn attach_tags<C: ConnectionTrait>(
    db: &C,
    recipe_id: i32,
    user_id: i32,
    names: &[String],
) -> Result<Vec<tag::Model>, DbErr> {
    let mut seen = BTreeSet::new();
    let mut tags = Vec::with_capacity(names.len());
    for name in names {
        let tag = get_or_create_tag(db, user_id, name).await?;
        if seen.insert(tag.id) {
            tags.push(tag);
        }
    }
    if tags.is_empty() {
        return Ok(tags);
    }

    let links = tags.iter().map(|tag| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(tag.id),
    });
    recipe_tag::Entity::insert_many(links)
        .on_conflict(
            OnConflict::columns([recipe_tag::Column::RecipeId, recipe_tag::Column::TagId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(tags)
}

/// Resolves every name and links the resulting ingredients to the recipe.
pub async fn attach_ingredients<C: ConnectionTrait>(
    db: &C,
    recipe_id: i32,
    user_id: i32,
    names: &[String],
) -> Result<Vec<ingredient::Model>, DbErr> {
    let mut seen = BTreeSet::new();
    let mut ingredients = Vec::with_capacity(names.len());
    for name in names {
        let ingredient = get_or_create_ingredient(db, user_id, name).await?;
        if seen.insert(ingredient.id) {
            ingredients.push(ingredient);
        }
    }
    if ingredients.is_empty() {
        return Ok(ingredients);
    }

    let links = ingredients.iter().map(|ingredient| recipe_ingredient::ActiveModel {
        recipe_id: Set(recipe_id),
        ingredient_id: Set(ingredient.id),
    });
    recipe_ingredient::Entity::insert_many(links)
        .on_conflict(
            OnConflict::columns([
                recipe_ingredient::Column::RecipeId,
                recipe_ingredient::Column::IngredientId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(ingredients)
}

pub async fn clear_tags<C: ConnectionTrait>(db: &C, recipe_id: i32) -> Result<u64, DbErr> {
    let result = recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn clear_ingredients<C: ConnectionTrait>(db: &C, recipe_id: i32) -> Result<u64, DbErr> {
    let result = recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Brings the recipe's tag and ingredient sets in line with the given names.
///
/// `Some(names)` replaces the whole set for that kind (an empty slice clears
/// it); `None` leaves that kind untouched. Every created tag or ingredient is
/// owned by `user_id`, which must also own the recipe.
pub async fn reconcile_associations<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    recipe_id: i32,
    tag_names: Option<&[String]>,
    ingredient_names: Option<&[String]>,
) -> Result<(), DbErr> {
    if let Some(names) = tag_names {
        clear_tags(db, recipe_id).await?;
        attach_tags(db, recipe_id, user_id, names).await?;
    }
    if let Some(names) = ingredient_names {
        clear_ingredients(db, recipe_id).await?;
        attach_ingredients(db, recipe_id, user_id, names).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_recipe_row, create_user, setup_db};
    use sea_orm::PaginatorTrait;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn linked_tag_ids<C: ConnectionTrait>(db: &C, recipe_id: i32) -> Vec<i32> {
        let mut ids: Vec<i32> = recipe_tag::Entity::find()
            .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
            .all(db)
            .await
            .unwrap()
            .into_iter()
            .map(|link| link.tag_id)
            .collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn get_or_create_tag_is_idempotent_per_owner() {
        let db = setup_db().await;
        let user = create_user(&db, "cook@example.com").await;

        let first = get_or_create_tag(&db, user.id, "dinner").await.unwrap();
        let second = get_or_create_tag(&db, user.id, "dinner").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(tag::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn same_name_under_two_owners_yields_two_rows() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice@example.com").await;
        let bob = create_user(&db, "bob@example.com").await;

        let a = get_or_create_ingredient(&db, alice.id, "salt").await.unwrap();
        let b = get_or_create_ingredient(&db, bob.id, "salt").await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.user_id, alice.id);
        assert_eq!(b.user_id, bob.id);
        assert_eq!(ingredient::Entity::find().count(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn attach_collapses_duplicate_names() {
        let db = setup_db().await;
        let user = create_user(&db, "cook@example.com").await;
        let recipe = create_recipe_row(&db, user.id, "Soup").await;

        let tags = attach_tags(&db, recipe.id, user.id, &names(&["easy", "easy", "dinner"]))
            .await
            .unwrap();

        assert_eq!(tags.len(), 2);
        assert_eq!(linked_tag_ids(&db, recipe.id).await.len(), 2);
    }

    #[tokio::test]
    async fn reconcile_replaces_supplied_kind_only() {
        let db = setup_db().await;
        let user = create_user(&db, "cook@example.com").await;
        let recipe = create_recipe_row(&db, user.id, "Soup").await;

        reconcile_associations(
            &db,
            user.id,
            recipe.id,
            Some(names(&["dinner", "easy"]).as_slice()),
            Some(names(&["leek"]).as_slice()),
        )
        .await
        .unwrap();

        reconcile_associations(&db, user.id, recipe.id, Some(names(&["lunch"]).as_slice()), None)
            .await
            .unwrap();

        let lunch = get_or_create_tag(&db, user.id, "lunch").await.unwrap();
        assert_eq!(linked_tag_ids(&db, recipe.id).await, vec![lunch.id]);
        let ingredient_links = recipe_ingredient::Entity::find()
            .filter(recipe_ingredient::Column::RecipeId.eq(recipe.id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(ingredient_links, 1);
        // Replaced tags stay in the store.
        assert_eq!(tag::Entity::find().count(&db).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn empty_list_clears_associations() {
        let db = setup_db().await;
        let user = create_user(&db, "cook@example.com").await;
        let recipe = create_recipe_row(&db, user.id, "Soup").await;

        reconcile_associations(&db, user.id, recipe.id, Some(names(&["dinner"]).as_slice()), None)
            .await
            .unwrap();
        reconcile_associations(&db, user.id, recipe.id, Some(&[] as &[String]), None)
            .await
            .unwrap();

        assert!(linked_tag_ids(&db, recipe.id).await.is_empty());
    }
}
