use sea_orm::prelude::Decimal;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    LoaderTrait, ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info};

use crate::db::entities::{ingredient, recipe, recipe_ingredient, recipe_tag, tag};
use crate::db::services::reconcile_service::reconcile_associations;

#[derive(Debug, thiserror::Error)]
pub enum RecipeServiceError {
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),
    #[error("Recipe not found: {0}")]
    NotFound(i32),
}

/// Scalar fields of a recipe being created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub description: String,
}

/// Scalar fields to assign on update; `None` leaves the column as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub description: Option<String>,
}

impl RecipeChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.time_minutes.is_none()
            && self.price.is_none()
            && self.link.is_none()
            && self.description.is_none()
    }
}

/// Id filters for recipe listing. A recipe matches a filter when at least one
/// of its tags (ingredients) is in the set; both filters must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tag_ids: Option<Vec<i32>>,
    pub ingredient_ids: Option<Vec<i32>>,
}

/// A recipe together with its associated tags and ingredients, each sorted by id.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeWithRelations {
    pub recipe: recipe::Model,
    pub tags: Vec<tag::Model>,
    pub ingredients: Vec<ingredient::Model>,
}

pub struct RecipeService;

impl RecipeService {
    pub async fn create_recipe(
        db: &DatabaseConnection,
        user_id: i32,
        fields: NewRecipe,
        tag_names: &[String],
        ingredient_names: &[String],
    ) -> Result<RecipeWithRelations, RecipeServiceError> {
        let txn = db.begin().await?;

        let new_recipe = recipe::ActiveModel {
            user_id: Set(user_id),
            title: Set(fields.title),
            time_minutes: Set(fields.time_minutes),
            price: Set(fields.price),
            link: Set(fields.link),
            description: Set(fields.description),
            image: Set(None),
            ..Default::default()
        };
        let recipe = new_recipe.insert(&txn).await?;
        reconcile_associations(&txn, user_id, recipe.id, Some(tag_names), Some(ingredient_names))
            .await?;

        txn.commit().await?;
        info!(recipe_id = recipe.id, user_id, "Recipe created.");

        Ok(Self::load_relations(db, recipe).await?)
    }

    /// Applies `changes` and, for each supplied name list, replaces the
    /// matching association set. Omitted lists keep their associations.
    pub async fn update_recipe(
        db: &DatabaseConnection,
        recipe_id: i32,
        user_id: i32,
        changes: RecipeChanges,
        tag_names: Option<&[String]>,
        ingredient_names: Option<&[String]>,
    ) -> Result<RecipeWithRelations, RecipeServiceError> {
        let txn = db.begin().await?;

        let recipe = Self::find_owned_recipe(&txn, recipe_id, user_id).await?;
        reconcile_associations(&txn, user_id, recipe.id, tag_names, ingredient_names).await?;

        let recipe = if changes.is_empty() {
            recipe
        } else {
            let mut active_recipe: recipe::ActiveModel = recipe.into();
            if let Some(title) = changes.title {
                active_recipe.title = Set(title);
            }
            if let Some(time_minutes) = changes.time_minutes {
                active_recipe.time_minutes = Set(time_minutes);
            }
            if let Some(price) = changes.price {
                active_recipe.price = Set(price);
            }
            if let Some(link) = changes.link {
                active_recipe.link = Set(link);
            }
            if let Some(description) = changes.description {
                active_recipe.description = Set(description);
            }
            active_recipe.update(&txn).await?
        };

        txn.commit().await?;
        info!(recipe_id, user_id, "Recipe updated.");

        Ok(Self::load_relations(db, recipe).await?)
    }

    pub async fn get_recipe(
        db: &DatabaseConnection,
        recipe_id: i32,
        user_id: i32,
    ) -> Result<RecipeWithRelations, RecipeServiceError> {
        let recipe = Self::find_owned_recipe(db, recipe_id, user_id).await?;
        Ok(Self::load_relations(db, recipe).await?)
    }

    pub async fn delete_recipe(
        db: &DatabaseConnection,
        recipe_id: i32,
        user_id: i32,
    ) -> Result<recipe::Model, RecipeServiceError> {
        let recipe = Self::find_owned_recipe(db, recipe_id, user_id).await?;
        recipe.clone().delete(db).await?;
        info!(recipe_id, user_id, "Recipe deleted.");
        Ok(recipe)
    }

    /// Lists the user's recipes, newest id first, each recipe at most once.
    pub async fn list_recipes(
        db: &DatabaseConnection,
        user_id: i32,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeWithRelations>, RecipeServiceError> {
        let mut query = recipe::Entity::find().filter(recipe::Column::UserId.eq(user_id));

        if let Some(tag_ids) = &filter.tag_ids {
            query = query.filter(
                recipe::Column::Id.in_subquery(
                    Query::select()
                        .column(recipe_tag::Column::RecipeId)
                        .from(recipe_tag::Entity)
                        .and_where(recipe_tag::Column::TagId.is_in(tag_ids.iter().copied()))
                        .to_owned(),
                ),
            );
        }
        if let Some(ingredient_ids) = &filter.ingredient_ids {
            query = query.filter(
                recipe::Column::Id.in_subquery(
                    Query::select()
                        .column(recipe_ingredient::Column::RecipeId)
                        .from(recipe_ingredient::Entity)
                        .and_where(
                            recipe_ingredient::Column::IngredientId
                                .is_in(ingredient_ids.iter().copied()),
                        )
                        .to_owned(),
                ),
            );
        }

        let recipes = query.order_by_desc(recipe::Column::Id).all(db).await?;
        debug!(user_id, count = recipes.len(), ?filter, "Listed recipes.");
        Ok(Self::load_relations_many(db, recipes).await?)
    }

    /// Points the recipe at a newly stored image. Returns the updated row and
    /// the image path it replaced, if any.
    pub async fn set_recipe_image(
        db: &DatabaseConnection,
        recipe_id: i32,
        user_id: i32,
        image_path: String,
    ) -> Result<(recipe::Model, Option<String>), RecipeServiceError> {
        let recipe = Self::find_owned_recipe(db, recipe_id, user_id).await?;
        let previous = recipe.image.clone();

        let mut active_recipe: recipe::ActiveModel = recipe.into();
        active_recipe.image = Set(Some(image_path));
        let updated = active_recipe.update(db).await?;
        info!(recipe_id, user_id, "Recipe image updated.");
        Ok((updated, previous))
    }

    /// Fetches a recipe only if `user_id` owns it. Absent and foreign recipes
    /// are both reported as `NotFound`.
    pub async fn find_owned_recipe<C: ConnectionTrait>(
        db: &C,
        recipe_id: i32,
        user_id: i32,
    ) -> Result<recipe::Model, RecipeServiceError> {
        recipe::Entity::find_by_id(recipe_id)
            .filter(recipe::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or(RecipeServiceError::NotFound(recipe_id))
    }

    async fn load_relations<C: ConnectionTrait>(
        db: &C,
        recipe: recipe::Model,
    ) -> Result<RecipeWithRelations, DbErr> {
        let mut loaded = Self::load_relations_many(db, vec![recipe.clone()]).await?;
        Ok(loaded.pop().unwrap_or(RecipeWithRelations {
            recipe,
            tags: Vec::new(),
            ingredients: Vec::new(),
        }))
    }

    async fn load_relations_many<C: ConnectionTrait>(
        db: &C,
        recipes: Vec<recipe::Model>,
    ) -> Result<Vec<RecipeWithRelations>, DbErr> {
        let tags = recipes
            .load_many_to_many(tag::Entity, recipe_tag::Entity, db)
            .await?;
        let ingredients = recipes
            .load_many_to_many(ingredient::Entity, recipe_ingredient::Entity, db)
            .await?;

        Ok(recipes
            .into_iter()
            .zip(tags)
            .zip(ingredients)
            .map(|((recipe, mut tags), mut ingredients)| {
                tags.sort_by_key(|tag| tag.id);
                ingredients.sort_by_key(|ingredient| ingredient.id);
                RecipeWithRelations {
                    recipe,
                    tags,
                    ingredients,
                }
            })
            .collect())
    }
}
