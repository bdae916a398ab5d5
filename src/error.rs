use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Body of every non-2xx response from the book API.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub status: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Title is required")]
    InvalidTitle,
    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),
    #[error("Book not found")]
    NotFound,
    #[error("Sorry, you are not allowed to do that.")]
    Forbidden,
    #[error("{message}")]
    Storage {
        message: &'static str,
        cause: anyhow::Error,
    },
}

impl ApiError {
    pub fn storage(message: &'static str, cause: anyhow::Error) -> Self {
        ApiError::Storage { message, cause }
    }

    pub fn code(&self) -> &'static str {
        use ApiError::*;
        match self {
            InvalidTitle => "invalid_title",
            InvalidJson(_) => "rest_invalid_json",
            NotFound => "no_book",
            Forbidden => "rest_forbidden",
            Storage { .. } => "db_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        use ApiError::*;
        match self {
            InvalidTitle | InvalidJson(_) => StatusCode::BAD_REQUEST,
            NotFound => StatusCode::NOT_FOUND,
            Forbidden => StatusCode::FORBIDDEN,
            Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Storage { cause, .. } = &self {
            tracing::error!(error = %crate::unpack_error(&**cause), "{}", self);
        }

        let status = self.status_code();
        let body = ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
