use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::uploads::UploadError;

/// Error types for lesson operations
#[derive(Debug, thiserror::Error)]
pub enum LessonError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Lesson not found")]
    NotFound,

    #[error("Student not found: {0}")]
    StudentNotFound(Uuid),

    #[error("Lesson is not part of a series")]
    NotASeries,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for LessonError {
    fn from(err: sqlx::Error) -> Self {
        LessonError::DatabaseError(err.to_string())
    }
}

impl From<UploadError> for LessonError {
    fn from(err: UploadError) -> Self {
        LessonError::ValidationError(err.to_string())
    }
}

impl IntoResponse for LessonError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            LessonError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            LessonError::NotFound => (StatusCode::NOT_FOUND, "Lesson not found".to_string()),
            LessonError::StudentNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Student with id {} not found", id),
            ),
            LessonError::NotASeries => (
                StatusCode::BAD_REQUEST,
                "Lesson is not part of a series".to_string(),
            ),
            LessonError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
