use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::payments::{Payment, PaymentError, RecordPaymentRequest};
use crate::students::StudentsRepository;

/// Default ledger comment when a payment carries none
const DEFAULT_PAYMENT_COMMENT: &str = "Balance top-up";

/// Records payments and mirrors them into the transaction ledger
#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
}

impl PaymentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records a payment for a student.
    ///
    /// The amount is applied with its sign as given: positive tops up
    /// the balance, negative records a manual charge/correction. In one
    /// transaction: locks the student row, inserts the payment, moves
    /// the balance, and writes the mirroring ledger entry with the same
    /// amount. A payment that fails any step leaves no trace.
    pub async fn record_payment(
        &self,
        request: RecordPaymentRequest,
    ) -> Result<Payment, PaymentError> {
        let mut tx = self.pool.begin().await?;

        let student = StudentsRepository::lock_by_id(&mut *tx, request.student_id)
            .await?
            .ok_or(PaymentError::StudentNotFound(request.student_id))?;

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (student_id, amount, comment)
            VALUES ($1, $2, $3)
            RETURNING id, student_id, amount, comment, created_at
            "#,
        )
        .bind(request.student_id)
        .bind(request.amount)
        .bind(&request.comment)
        .fetch_one(&mut *tx)
        .await?;

        self.apply_balance_change(&mut tx, student.id, request.amount)
            .await?;

        let ledger_comment = request
            .comment
            .as_deref()
            .unwrap_or(DEFAULT_PAYMENT_COMMENT);

        sqlx::query(
            r#"
            INSERT INTO transactions (student_id, amount, comment)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(student.id)
        .bind(request.amount)
        .bind(ledger_comment)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Recorded payment {} of {} for student {}",
            payment.id,
            payment.amount,
            student.id
        );

        Ok(payment)
    }

    async fn apply_balance_change(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        student_id: Uuid,
        amount: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE students
            SET balance = balance + $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(amount)
        .bind(student_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
