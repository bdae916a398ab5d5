#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use library_manager::auth::Authenticator;
use library_manager::config::{ApiUser, Auth};
use library_manager::db::Database;
use library_manager::handler::AppState;
use library_manager::routes;

pub const TOKEN_HEADER: &str = "X-Library-Token";
pub const EDIT_TOKEN: &str = "edit-token";
pub const READ_TOKEN: &str = "read-token";

pub fn test_auth() -> Auth {
    Auth {
        header: TOKEN_HEADER.to_string(),
        users: vec![
            ApiUser {
                name: "editor".to_string(),
                token: EDIT_TOKEN.to_string(),
                can_edit: true,
            },
            ApiUser {
                name: "reader".to_string(),
                token: READ_TOKEN.to_string(),
                can_edit: false,
            },
        ],
    }
}

/// Full application router over a fresh database in a temporary directory.
///
/// The `TempDir` must be kept alive for as long as the router is used.
pub async fn build_test_app() -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_local(&dir.path().join("library.db")).await.unwrap();
    let state = AppState {
        db: Arc::new(db),
        auth: Arc::new(Authenticator::new(&test_auth())),
    };
    (dir, routes::app(state))
}

/// Sends one request and returns the status with the body parsed as JSON
/// (`Value::Null` for an empty body).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(TOKEN_HEADER, token);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None, None).await
}

pub async fn create(app: &Router, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, "/books", Some(EDIT_TOKEN), Some(body)).await
}
