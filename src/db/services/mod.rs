//! Owner-scoped data access for recipes, tags and ingredients.
//!
//! Every public function takes the acting user's id explicitly; nothing here
//! reads request state. Sub-module items are re-exported for
//! `crate::db::services::*` access.

pub mod ingredient_service;
pub mod recipe_service;
pub mod reconcile_service;
pub mod tag_service;

pub use ingredient_service::*;
pub use recipe_service::*;
pub use reconcile_service::*;
pub use tag_service::*;
