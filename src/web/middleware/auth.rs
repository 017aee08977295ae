use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use sea_orm::EntityTrait;
use std::sync::Arc;
use tracing::warn;

use crate::db::entities::user;
use crate::web::models::{AuthenticatedUser, Claims};
use crate::web::{AppState, error::AppError};

/// Rejects requests without a valid token and exposes the caller as an
/// `AuthenticatedUser` extension to the handlers behind it.
pub async fn auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    let jwt_secret = &state.config.jwt_secret;

    // Authorization header first, then the "token" cookie.
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .or_else(|| jar.get("token").map(|c| c.value().to_string()))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided.".to_string())
        })?;

    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!(error = ?e, "JWT decoding error during auth middleware.");
        AppError::Unauthorized("Invalid token.".to_string())
    })?;

    let user_id = token_data.claims.user_id;
    let active = user::Entity::find_by_id(user_id)
        .one(&state.db_pool)
        .await?
        .is_some_and(|user| user.is_active);
    if !active {
        warn!(user_id, "Token presented for an inactive or deleted user.");
        return Err(AppError::Unauthorized("User inactive or deleted.".to_string()));
    }

    let authenticated_user = AuthenticatedUser {
        id: user_id,
        subject: token_data.claims.sub,
    };
    req.extensions_mut().insert(authenticated_user);
    Ok(next.run(req).await)
}
