// HTTP handlers for the student registry and its audit trail

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::payments::Payment;
use crate::students::{
    CreateStudentRequest, ReconciliationReport, Student, Transaction, UpdateStudentRequest,
};
use crate::AppState;

/// Handler for POST /api/students
/// Registers a new student
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Student registered", body = Student),
        (status = 400, description = "Invalid input data"),
        (status = 500, description = "Internal server error")
    ),
    tag = "students"
)]
pub async fn create_student(
    State(state): State<AppState>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<Student>), ApiError> {
    tracing::debug!("Registering new student: {}", payload.full_name);

    payload.validate()?;

    let student = state.students_repo.create(payload).await?;

    tracing::info!("Registered student {} ({})", student.id, student.slug);
    Ok((StatusCode::CREATED, Json(student)))
}

/// Handler for GET /api/students
/// Lists all students
#[utoipa::path(
    get,
    path = "/api/students",
    responses(
        (status = 200, description = "List of all students", body = Vec<Student>),
        (status = 500, description = "Internal server error")
    ),
    tag = "students"
)]
pub async fn list_students(
    State(state): State<AppState>,
) -> Result<Json<Vec<Student>>, ApiError> {
    let students = state.students_repo.list().await?;

    tracing::debug!("Retrieved {} students", students.len());
    Ok(Json(students))
}

/// Handler for GET /api/students/:id
#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(("id" = String, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student found", body = Student),
        (status = 404, description = "Student not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "students"
)]
pub async fn get_student_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Student>, ApiError> {
    let student = state
        .students_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "Student".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(student))
}

/// Handler for PATCH /api/students/:id
/// Applies a sparse update; omitted fields keep their current values
#[utoipa::path(
    patch,
    path = "/api/students/{id}",
    params(("id" = String, Path, description = "Student ID")),
    request_body = UpdateStudentRequest,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 400, description = "Invalid input data"),
        (status = 404, description = "Student not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "students"
)]
pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStudentRequest>,
) -> Result<Json<Student>, ApiError> {
    tracing::debug!("Updating student {}", id);

    payload.validate()?;

    let student = state
        .students_repo
        .update(id, payload)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "Student".to_string(),
            id: id.to_string(),
        })?;

    tracing::info!("Updated student {}", id);
    Ok(Json(student))
}

/// Handler for GET /api/students/:id/transactions
/// Ledger entries for a student, newest first
pub async fn get_student_transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    ensure_student_exists(&state, id).await?;

    let entries = state.students_repo.transactions(id).await?;
    Ok(Json(entries))
}

/// Handler for GET /api/students/:id/payments
pub async fn get_student_payments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    ensure_student_exists(&state, id).await?;

    let payments = state.students_repo.payments(id).await?;
    Ok(Json(payments))
}

/// Handler for POST /api/students/:id/reconcile
///
/// Recomputes the balance from the transaction ledger and reports the
/// drift against the stored value. Both values come from one query
/// snapshot, so concurrent billing cannot fake a drift. Read-only:
/// nothing is corrected automatically.
pub async fn reconcile_student(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReconciliationReport>, ApiError> {
    let (stored_balance, ledger_balance) = state
        .students_repo
        .balance_snapshot(id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "Student".to_string(),
            id: id.to_string(),
        })?;

    let report = ReconciliationReport::new(id, stored_balance, ledger_balance);

    if !report.is_consistent() {
        tracing::warn!(
            "Balance drift for student {}: stored {} vs ledger {}",
            id,
            report.stored_balance,
            report.ledger_balance
        );
    }

    Ok(Json(report))
}

async fn ensure_student_exists(state: &AppState, id: Uuid) -> Result<Student, ApiError> {
    state
        .students_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "Student".to_string(),
            id: id.to_string(),
        })
}
