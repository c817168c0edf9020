use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A student account
///
/// `balance` is the signed running account value: positive = credit
/// (prepaid), negative = debt. It is denormalized for fast reads and is
/// mutated only by the billing engine and the payment recorder; the
/// transactions table is the audit source of truth.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    #[schema(value_type = String, example = "7f8df5f1-1f3a-4f7e-9a44-1f2ab56c9d10")]
    pub id: Uuid,
    #[schema(example = "Anna Kovalenko")]
    pub full_name: String,
    /// URL-safe identifier derived from the display name
    #[schema(example = "anna-kovalenko")]
    pub slug: String,
    pub parent_name: Option<String>,
    pub parent_contact: Option<String>,
    #[schema(example = "8th grade")]
    pub grade: Option<String>,
    /// Per-lesson price applied when a lesson is scheduled without an
    /// explicit price. Changing it never touches existing lessons.
    #[schema(value_type = f64, example = 500.0)]
    pub default_price: Decimal,
    pub comment: Option<String>,
    #[schema(value_type = f64, example = -500.0)]
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for registering a student
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, message = "Full name must not be empty"))]
    #[schema(example = "Anna Kovalenko")]
    pub full_name: String,
    pub parent_name: Option<String>,
    pub parent_contact: Option<String>,
    pub grade: Option<String>,
    #[validate(custom = "crate::validation::validate_non_negative_price")]
    #[schema(value_type = f64, example = 500.0)]
    pub default_price: Option<Decimal>,
    pub comment: Option<String>,
}

/// Request DTO for a sparse student update
///
/// Only fields present in the payload are applied. Balance is
/// deliberately absent: it moves only through transactions.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateStudentRequest {
    #[validate(length(min = 1, message = "Full name must not be empty"))]
    pub full_name: Option<String>,
    pub parent_name: Option<String>,
    pub parent_contact: Option<String>,
    pub grade: Option<String>,
    #[validate(custom = "crate::validation::validate_non_negative_price")]
    #[schema(value_type = f64)]
    pub default_price: Option<Decimal>,
    pub comment: Option<String>,
}

/// An immutable ledger entry
///
/// `amount` is the delta applied to the student's balance: positive
/// increases it. Every balance mutation is paired with exactly one row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub student_id: Uuid,
    pub amount: Decimal,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Result of recomputing a student's balance from the ledger
///
/// Since every payment is mirrored 1:1 by a transaction, the ledger
/// balance is the plain sum of transaction amounts.
#[derive(Debug, Serialize)]
pub struct ReconciliationReport {
    pub student_id: Uuid,
    pub stored_balance: Decimal,
    pub ledger_balance: Decimal,
    pub drift: Decimal,
}

impl ReconciliationReport {
    /// Builds the report from one atomically-read (stored, ledger) pair
    pub fn new(student_id: Uuid, stored_balance: Decimal, ledger_balance: Decimal) -> Self {
        Self {
            student_id,
            stored_balance,
            ledger_balance,
            drift: stored_balance - ledger_balance,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.drift.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_partial_fields() {
        let json = r#"{ "full_name": "Renamed", "default_price": 450 }"#;

        let update: UpdateStudentRequest =
            serde_json::from_str(json).expect("Failed to deserialize UpdateStudentRequest");

        assert_eq!(update.full_name, Some("Renamed".to_string()));
        assert!(update.default_price.is_some());
        assert_eq!(update.parent_name, None);
        assert_eq!(update.grade, None);
        assert_eq!(update.comment, None);
    }

    #[test]
    fn test_update_request_empty() {
        let update: UpdateStudentRequest =
            serde_json::from_str("{}").expect("Failed to deserialize empty update");

        assert_eq!(update.full_name, None);
        assert_eq!(update.default_price, None);
    }

    #[test]
    fn test_reconciliation_report_computes_drift() {
        use rust_decimal_macros::dec;

        let report = ReconciliationReport::new(Uuid::new_v4(), dec!(-100), dec!(-150));

        assert_eq!(report.drift, dec!(50));
        assert!(!report.is_consistent());

        let clean = ReconciliationReport::new(Uuid::new_v4(), dec!(200), dec!(200));
        assert!(clean.is_consistent());
    }

    #[test]
    fn test_reconciliation_consistency() {
        use rust_decimal_macros::dec;

        let report = ReconciliationReport {
            student_id: Uuid::new_v4(),
            stored_balance: dec!(-50),
            ledger_balance: dec!(-50),
            drift: Decimal::ZERO,
        };
        assert!(report.is_consistent());

        let drifted = ReconciliationReport {
            drift: dec!(0.01),
            ..report
        };
        assert!(!drifted.is_consistent());
    }
}
