//! Shared fixtures for database and router tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::prelude::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

use crate::db::entities::{recipe, user};
use crate::db::schema::create_schema;
use crate::server::config::ServerConfig;
use crate::web::create_axum_router;
use crate::web::models::Claims;

pub const TEST_JWT_SECRET: &str = "test-secret";

/// Fresh in-memory SQLite database with the full schema. A single pooled
/// connection keeps every query on the same in-memory database.
pub async fn setup_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect to in-memory sqlite");
    create_schema(&db).await.expect("create schema");
    db
}

pub async fn create_user(db: &DatabaseConnection, email: &str) -> user::Model {
    user::ActiveModel {
        email: Set(email.to_owned()),
        name: Set(email.split('@').next().unwrap_or(email).to_owned()),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user")
}

/// Bare recipe row without any associations.
pub async fn create_recipe_row(db: &DatabaseConnection, user_id: i32, title: &str) -> recipe::Model {
    recipe::ActiveModel {
        user_id: Set(user_id),
        title: Set(title.to_owned()),
        time_minutes: Set(10),
        price: Set(Decimal::new(500, 2)),
        link: Set(String::new()),
        description: Set(String::new()),
        image: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert recipe")
}

pub fn test_config(media_dir: &std::path::Path) -> Arc<ServerConfig> {
    Arc::new(ServerConfig {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        media_dir: media_dir.to_string_lossy().into_owned(),
        media_url: "/media".to_string(),
        log_dir: "logs".to_string(),
        max_upload_bytes: 1024 * 1024,
        db_max_connections: 1,
        auto_create_schema: false,
    })
}

/// Signs a token the auth middleware accepts for `user`.
pub fn token_for(user: &user::Model) -> String {
    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        exp: (jsonwebtoken::get_current_timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_ref()),
    )
    .expect("encode test token")
}

/// Full application router over `db`, storing media under `media_dir`.
pub fn test_router(db: &DatabaseConnection, media_dir: &std::path::Path) -> Router {
    create_axum_router(db.clone(), test_config(media_dir))
}

pub fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    }
}

/// Sends `request` through `app`. Empty bodies come back as `Value::Null`.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    use tower::ServiceExt;

    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("read body").to_bytes();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}
