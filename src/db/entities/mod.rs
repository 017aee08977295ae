//! SeaORM entities for the recipe store.
//!
//! Recipes, tags and ingredients all carry a `user_id` owner column; the two
//! join tables hold the many-to-many associations of a recipe.

pub mod user;
pub mod recipe;
pub mod tag;
pub mod ingredient;
pub mod recipe_tag;
pub mod recipe_ingredient;
