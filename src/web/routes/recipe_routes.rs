use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Extension, Multipart, Path, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::services::{RecipeService, RecipeServiceError};
use crate::services::image_service::ImageError;
use crate::web::error::FieldErrors;
use crate::web::models::{
    AuthenticatedUser, PayloadMode, RecipeDetailResponse, RecipeImageResponse, RecipeListQuery,
    RecipePayload, RecipeResponse,
};
use crate::web::{AppError, AppState};

const IMAGE_FIELD: &str = "image";

impl From<RecipeServiceError> for AppError {
    fn from(err: RecipeServiceError) -> Self {
        match err {
            RecipeServiceError::DbErr(db_err) => AppError::DatabaseError(db_err.to_string()),
            RecipeServiceError::NotFound(_) => AppError::NotFound("Recipe not found.".to_string()),
        }
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Missing | ImageError::Invalid => {
                AppError::Validation(FieldErrors::single(IMAGE_FIELD, err.to_string()))
            }
            ImageError::Io(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

async fn list_recipes_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    query: Result<Query<RecipeListQuery>, QueryRejection>,
) -> Result<Json<Vec<RecipeResponse>>, AppError> {
    let Query(query) = query.map_err(|e| AppError::InvalidFilter(e.body_text()))?;
    let filter = query.into_filter()?;
    let recipes =
        RecipeService::list_recipes(&app_state.db_pool, authenticated_user.id, &filter).await?;
    Ok(Json(recipes.into_iter().map(RecipeResponse::from).collect()))
}

async fn create_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<RecipePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<RecipeDetailResponse>), AppError> {
    let Json(payload) = payload?;
    let (new_recipe, tag_names, ingredient_names) =
        payload.validate(PayloadMode::Full)?.into_new_recipe();

    let created = RecipeService::create_recipe(
        &app_state.db_pool,
        authenticated_user.id,
        new_recipe,
        &tag_names,
        &ingredient_names,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(RecipeDetailResponse::new(created, &app_state.config.media_url)),
    ))
}

async fn get_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
) -> Result<Json<RecipeDetailResponse>, AppError> {
    let recipe =
        RecipeService::get_recipe(&app_state.db_pool, recipe_id, authenticated_user.id).await?;
    Ok(Json(RecipeDetailResponse::new(recipe, &app_state.config.media_url)))
}

async fn save_recipe(
    app_state: &AppState,
    user_id: i32,
    recipe_id: i32,
    payload: Result<Json<RecipePayload>, JsonRejection>,
    mode: PayloadMode,
) -> Result<Json<RecipeDetailResponse>, AppError> {
    // Ownership is checked before the body so foreign ids answer 404, not 400.
    RecipeService::find_owned_recipe(&app_state.db_pool, recipe_id, user_id).await?;

    let Json(payload) = payload?;
    let validated = payload.validate(mode)?;
    let updated = RecipeService::update_recipe(
        &app_state.db_pool,
        recipe_id,
        user_id,
        validated.changes,
        validated.tag_names.as_deref(),
        validated.ingredient_names.as_deref(),
    )
    .await?;
    Ok(Json(RecipeDetailResponse::new(updated, &app_state.config.media_url)))
}

async fn update_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
    payload: Result<Json<RecipePayload>, JsonRejection>,
) -> Result<Json<RecipeDetailResponse>, AppError> {
    save_recipe(&app_state, authenticated_user.id, recipe_id, payload, PayloadMode::Full).await
}

async fn partial_update_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
    payload: Result<Json<RecipePayload>, JsonRejection>,
) -> Result<Json<RecipeDetailResponse>, AppError> {
    save_recipe(&app_state, authenticated_user.id, recipe_id, payload, PayloadMode::Partial).await
}

async fn delete_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let deleted =
        RecipeService::delete_recipe(&app_state.db_pool, recipe_id, authenticated_user.id).await?;
    if let Some(image) = deleted.image {
        app_state.image_store.remove(&image).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Reads the bytes of the `image` field. Other fields are skipped; a request
/// that is not multipart at all counts as having no file.
async fn read_image_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Vec<u8>, AppError> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!(error = %rejection, "Image upload without a multipart body.");
            return Err(ImageError::Missing.into());
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(bytes.to_vec());
    }
    Err(ImageError::Missing.into())
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidInput(format!("Multipart error: {}", err.body_text()))
    }
}

async fn upload_recipe_image_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RecipeImageResponse>, AppError> {
    let user_id = authenticated_user.id;
    RecipeService::find_owned_recipe(&app_state.db_pool, recipe_id, user_id).await?;

    let bytes = read_image_field(multipart).await?;
    let stored_path = app_state.image_store.save_recipe_image(&bytes).await?;

    match RecipeService::set_recipe_image(&app_state.db_pool, recipe_id, user_id, stored_path.clone())
        .await
    {
        Ok((recipe, previous)) => {
            if let Some(previous) = previous.filter(|previous| *previous != stored_path) {
                app_state.image_store.remove(&previous).await;
            }
            Ok(Json(RecipeImageResponse::new(&recipe, &app_state.config.media_url)))
        }
        Err(e) => {
            warn!(recipe_id, error = %e, "Discarding stored image after failed update.");
            app_state.image_store.remove(&stored_path).await;
            Err(e.into())
        }
    }
}

pub fn create_recipes_router(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/recipes", get(list_recipes_handler).post(create_recipe_handler))
        .route(
            "/api/recipes/{recipe_id}",
            get(get_recipe_handler)
                .put(update_recipe_handler)
                .patch(partial_update_recipe_handler)
                .delete(delete_recipe_handler),
        )
        .route(
            "/api/recipes/{recipe_id}/upload-image",
            post(upload_recipe_image_handler).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}
