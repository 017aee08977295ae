use axum::{
    Json, Router,
    extract::{Extension, Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, put},
};
use std::sync::Arc;

use crate::db::services::{self, TagServiceError};
use crate::web::error::FieldErrors;
use crate::web::models::{AuthenticatedUser, NamePayload, PayloadMode, TagResponse};
use crate::web::{AppError, AppState};

impl From<TagServiceError> for AppError {
    fn from(err: TagServiceError) -> Self {
        match err {
            TagServiceError::DbErr(db_err) => AppError::DatabaseError(db_err.to_string()),
            TagServiceError::NotFound(_) => AppError::NotFound("Tag not found.".to_string()),
            TagServiceError::DuplicateName(_) => AppError::Validation(FieldErrors::single(
                "name",
                "A tag with this name already exists.",
            )),
        }
    }
}

async fn get_user_tags_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<TagResponse>>, AppError> {
    let tags = services::get_tags_by_user_id(&app_state.db_pool, authenticated_user.id).await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

async fn rename_tag(
    app_state: &AppState,
    user_id: i32,
    tag_id: i32,
    payload: Result<Json<NamePayload>, JsonRejection>,
    mode: PayloadMode,
) -> Result<Json<TagResponse>, AppError> {
    let Json(payload) = payload?;
    let name = payload.validate(mode)?;
    let tag = services::update_tag(&app_state.db_pool, tag_id, user_id, name).await?;
    Ok(Json(TagResponse::from(tag)))
}

async fn update_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
    payload: Result<Json<NamePayload>, JsonRejection>,
) -> Result<Json<TagResponse>, AppError> {
    rename_tag(&app_state, authenticated_user.id, tag_id, payload, PayloadMode::Full).await
}

async fn partial_update_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
    payload: Result<Json<NamePayload>, JsonRejection>,
) -> Result<Json<TagResponse>, AppError> {
    rename_tag(&app_state, authenticated_user.id, tag_id, payload, PayloadMode::Partial).await
}

async fn delete_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    services::delete_tag(&app_state.db_pool, tag_id, authenticated_user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tags", get(get_user_tags_handler))
        .route(
            "/api/tags/{tag_id}",
            put(update_tag_handler)
                .patch(partial_update_tag_handler)
                .delete(delete_tag_handler),
        )
}
