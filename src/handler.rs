use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection, rejection::PathRejection},
    http::StatusCode,
    response::IntoResponse,
};

use tracing::info;

use crate::api::{BookPayload, BookQuery, HealthResponse};
use crate::auth::{Authenticator, RequireEditor};
use crate::db::Database;
use crate::error::ApiError;
use crate::model::Book;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<Authenticator>,
}

// Ids that do not parse can never name a row.
fn book_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id).map_err(|_| ApiError::NotFound)
}

fn json_body(payload: Result<Json<BookPayload>, JsonRejection>) -> Result<BookPayload, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::InvalidJson(e.body_text()))
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let filter = query.into_filter();
    let books = state
        .db
        .list_books(&filter)
        .await
        .map_err(|e| ApiError::storage("Failed to list books", e))?;

    info!(count = books.len(), ?filter, "listed books");
    Ok(Json(books))
}

pub async fn get_book(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Book>, ApiError> {
    let id = book_id(path)?;
    match state.db.get_book(id).await {
        Ok(Some(book)) => Ok(Json(book)),
        Ok(None) => Err(ApiError::NotFound),
        Err(e) => Err(ApiError::storage("Failed to get book", e)),
    }
}

pub async fn create_book(
    State(state): State<AppState>,
    RequireEditor(caller): RequireEditor,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let new_book = json_body(payload)?.into_new_book()?;
    let book = state
        .db
        .create_book(&new_book)
        .await
        .map_err(|e| ApiError::storage("Failed to create book", e))?;

    info!(book_id = book.id, caller = caller.display_name(), "created book");
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update_book(
    State(state): State<AppState>,
    RequireEditor(caller): RequireEditor,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> Result<Json<Book>, ApiError> {
    let id = book_id(path)?;
    let changes = json_body(payload)?.into_changes()?;

    match state.db.update_book(id, changes).await {
        Ok(Some(book)) => {
            info!(book_id = id, caller = caller.display_name(), "updated book");
            Ok(Json(book))
        }
        Ok(None) => Err(ApiError::NotFound),
        Err(e) => Err(ApiError::storage("Failed to update book", e)),
    }
}

pub async fn delete_book(
    State(state): State<AppState>,
    RequireEditor(caller): RequireEditor,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = book_id(path)?;

    match state.db.delete_book(id).await {
        Ok(true) => {
            info!(book_id = id, caller = caller.display_name(), "deleted book");
            Ok(StatusCode::OK)
        }
        Ok(false) => Err(ApiError::NotFound),
        Err(e) => Err(ApiError::storage("Failed to delete book", e)),
    }
}
