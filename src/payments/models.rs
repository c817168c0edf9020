use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A recorded payment
///
/// Payments are append-only. Each one is mirrored by exactly one
/// transaction with the same amount, so the ledger stays the single
/// source of truth for the balance.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(value_type = String)]
    pub student_id: Uuid,
    #[schema(value_type = f64, example = 1000.0)]
    pub amount: Decimal,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for recording a payment
///
/// `amount` is signed: positive tops up the balance, negative records
/// a manual charge/correction. Zero is rejected.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentRequest {
    #[schema(value_type = String)]
    pub student_id: Uuid,
    #[validate(custom = "crate::validation::validate_nonzero_amount")]
    #[schema(value_type = f64, example = 1000.0)]
    pub amount: Decimal,
    pub comment: Option<String>,
}
