// HTTP handlers for payment recording

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::payments::{Payment, PaymentError, RecordPaymentRequest};
use crate::AppState;

/// Handler for POST /api/payments
/// Records a payment and credits the student's balance
#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = Payment),
        (status = 400, description = "Invalid input data"),
        (status = 404, description = "Student not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "payments"
)]
pub async fn record_payment_handler(
    State(state): State<AppState>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), PaymentError> {
    request
        .validate()
        .map_err(|e| PaymentError::ValidationError(e.to_string()))?;

    let payment = state.payment_service.record_payment(request).await?;

    Ok((StatusCode::CREATED, Json(payment)))
}
