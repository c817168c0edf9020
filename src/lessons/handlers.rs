// HTTP handlers for lesson scheduling, updates, and homework

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::lessons::{
    CreateHomeworkRequest, CreateLessonRequest, Homework, Lesson, LessonError,
    SeriesUpdateResponse, UpdateLessonRequest,
};
use crate::AppState;

/// Query parameters for the calendar window
#[derive(Debug, Deserialize)]
pub struct LessonWindowQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Handler for POST /api/lessons
/// Schedules a lesson, or a weekly series when `repeat_until` is set
pub async fn create_lessons_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateLessonRequest>,
) -> Result<(StatusCode, Json<Vec<Lesson>>), LessonError> {
    request
        .validate()
        .map_err(|e| LessonError::ValidationError(e.to_string()))?;

    let lessons = state.lesson_service.create_lessons(request).await?;

    Ok((StatusCode::CREATED, Json(lessons)))
}

/// Handler for GET /api/lessons?start=&end=
/// Lessons whose start time falls inside the calendar window
pub async fn get_lessons_handler(
    State(state): State<AppState>,
    Query(query): Query<LessonWindowQuery>,
) -> Result<Json<Vec<Lesson>>, LessonError> {
    let lessons = state
        .lesson_service
        .list_window(query.start, query.end)
        .await?;

    Ok(Json(lessons))
}

/// Handler for GET /api/lessons/:id
pub async fn get_lesson_by_id_handler(
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
) -> Result<Json<Lesson>, LessonError> {
    let lesson = state.lesson_service.get_lesson(lesson_id).await?;

    Ok(Json(lesson))
}

/// Handler for PATCH /api/lessons/:id
/// Sparse single-lesson update; status changes settle billing
pub async fn update_lesson_handler(
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
    Json(patch): Json<UpdateLessonRequest>,
) -> Result<Json<Lesson>, LessonError> {
    patch
        .validate()
        .map_err(|e| LessonError::ValidationError(e.to_string()))?;

    let lesson = state.lesson_service.update_lesson(lesson_id, patch).await?;

    Ok(Json(lesson))
}

/// Handler for PATCH /api/lessons/:id/series
/// Updates the lesson and propagates time shifts/topic to the series
pub async fn update_series_handler(
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
    Json(patch): Json<UpdateLessonRequest>,
) -> Result<Json<SeriesUpdateResponse>, LessonError> {
    patch
        .validate()
        .map_err(|e| LessonError::ValidationError(e.to_string()))?;

    let updated = state.lesson_service.update_series(lesson_id, patch).await?;

    Ok(Json(SeriesUpdateResponse { updated }))
}

/// Handler for POST /api/lessons/:id/homeworks
/// Attaches homework records; file metadata must pass the upload policy
pub async fn create_homeworks_handler(
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
    Json(request): Json<CreateHomeworkRequest>,
) -> Result<(StatusCode, Json<Vec<Homework>>), LessonError> {
    request
        .validate()
        .map_err(|e| LessonError::ValidationError(e.to_string()))?;

    let homeworks = state
        .lesson_service
        .attach_homeworks(lesson_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(homeworks)))
}

/// Handler for GET /api/lessons/:id/homeworks
pub async fn get_homeworks_handler(
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
) -> Result<Json<Vec<Homework>>, LessonError> {
    let homeworks = state.lesson_service.list_homeworks(lesson_id).await?;

    Ok(Json(homeworks))
}
