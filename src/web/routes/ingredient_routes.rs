use axum::{
    Json, Router,
    extract::{Extension, Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, put},
};
use std::sync::Arc;

use crate::db::services::{self, IngredientServiceError};
use crate::web::error::FieldErrors;
use crate::web::models::{AuthenticatedUser, NamePayload, PayloadMode, IngredientResponse};
use crate::web::{AppError, AppState};

impl From<IngredientServiceError> for AppError {
    fn from(err: IngredientServiceError) -> Self {
        match err {
            IngredientServiceError::DbErr(db_err) => AppError::DatabaseError(db_err.to_string()),
            IngredientServiceError::NotFound(_) => AppError::NotFound("Ingredient not found.".to_string()),
            IngredientServiceError::DuplicateName(_) => AppError::Validation(FieldErrors::single(
                "name",
                "An ingredient with this name already exists.",
            )),
        }
    }
}

async fn get_user_ingredients_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<IngredientResponse>>, AppError> {
    let ingredients = services::get_ingredients_by_user_id(&app_state.db_pool, authenticated_user.id).await?;
    Ok(Json(ingredients.into_iter().map(IngredientResponse::from).collect()))
}

async fn rename_ingredient(
    app_state: &AppState,
    user_id: i32,
    ingredient_id: i32,
    payload: Result<Json<NamePayload>, JsonRejection>,
    mode: PayloadMode,
) -> Result<Json<IngredientResponse>, AppError> {
    let Json(payload) = payload?;
    let name = payload.validate(mode)?;
    let ingredient = services::update_ingredient(&app_state.db_pool, ingredient_id, user_id, name).await?;
    Ok(Json(IngredientResponse::from(ingredient)))
}

async fn update_ingredient_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(ingredient_id): Path<i32>,
    payload: Result<Json<NamePayload>, JsonRejection>,
) -> Result<Json<IngredientResponse>, AppError> {
    rename_ingredient(&app_state, authenticated_user.id, ingredient_id, payload, PayloadMode::Full).await
}

async fn partial_update_ingredient_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(ingredient_id): Path<i32>,
    payload: Result<Json<NamePayload>, JsonRejection>,
) -> Result<Json<IngredientResponse>, AppError> {
    rename_ingredient(&app_state, authenticated_user.id, ingredient_id, payload, PayloadMode::Partial).await
}

async fn delete_ingredient_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(ingredient_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    services::delete_ingredient(&app_state.db_pool, ingredient_id, authenticated_user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_ingredients_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/ingredients", get(get_user_ingredients_handler))
        .route(
            "/api/ingredients/{ingredient_id}",
            put(update_ingredient_handler)
                .patch(partial_update_ingredient_handler)
                .delete(delete_ingredient_handler),
        )
}
