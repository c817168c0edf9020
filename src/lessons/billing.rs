//! Billing state-transition engine.
//!
//! Settles the balance consequences of a lesson status change: computes
//! the balance delta from the deduction policy, mutates the student's
//! balance, and appends the explaining ledger entry — all inside the
//! caller's open database transaction so the (student, lesson,
//! transaction) triple commits atomically.

use rust_decimal::Decimal;
use sqlx::PgConnection;

use crate::lessons::deduction::deduction;
use crate::lessons::{Lesson, LessonError, LessonStatus};
use crate::students::StudentsRepository;

/// A staged ledger entry explaining a balance change
///
/// `amount` follows the ledger sign convention: it equals the delta
/// applied to the balance, so a charge is negative and a refund
/// positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub amount: Decimal,
    pub comment: String,
}

/// The pure result of a status transition: how the balance moves and
/// which ledger entry (if any) records it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingOutcome {
    pub balance_change: Decimal,
    pub ledger_entry: Option<LedgerEntry>,
}

impl BillingOutcome {
    /// No balance movement, no ledger entry.
    pub fn no_op() -> Self {
        Self {
            balance_change: Decimal::ZERO,
            ledger_entry: None,
        }
    }

    /// Computes the outcome of moving a lesson between statuses.
    ///
    /// `old_status`/`old_price` are the pre-update snapshot;
    /// `new_status`/`new_price` come from the already-updated lesson.
    ///
    /// Rules:
    /// - unchanged status is a no-op, even if the price changed
    ///   (price-only edits never re-bill a settled lesson)
    /// - the balance moves by `deduction(old) - deduction(new)`
    /// - a ledger entry is staged only when the balance actually moves
    pub fn for_transition(
        old_status: LessonStatus,
        old_price: Decimal,
        new_status: LessonStatus,
        new_price: Decimal,
        topic: Option<&str>,
    ) -> Self {
        if old_status == new_status {
            return Self::no_op();
        }

        let balance_change = deduction(old_status, old_price) - deduction(new_status, new_price);
        if balance_change.is_zero() {
            return Self {
                balance_change,
                ledger_entry: None,
            };
        }

        let comment = match new_status {
            LessonStatus::Completed => format!(
                "Lesson conducted on topic: {}",
                topic.unwrap_or("untitled")
            ),
            LessonStatus::NoShow => {
                "Student did not attend (50% of lesson price charged)".to_string()
            }
            LessonStatus::Cancelled => "Lesson cancelled (refund)".to_string(),
            LessonStatus::Planned => "Balance correction due to status change".to_string(),
        };

        Self {
            balance_change,
            ledger_entry: Some(LedgerEntry {
                amount: balance_change,
                comment,
            }),
        }
    }

    pub fn is_no_op(&self) -> bool {
        self.balance_change.is_zero() && self.ledger_entry.is_none()
    }
}

/// Applies billing outcomes against the store
pub struct BillingEngine;

impl BillingEngine {
    /// Settles a status change inside the caller's open transaction.
    ///
    /// `lesson` must already carry its new status and price;
    /// `old_status`/`old_price` are the snapshot captured before the
    /// in-memory lesson was mutated. The student row is locked for the
    /// duration of the transaction. A missing student degrades to a
    /// warn-logged no-op so the lesson-update path stays available.
    ///
    /// Does not commit; the caller owns the transaction boundary.
    pub async fn apply_status_change(
        conn: &mut PgConnection,
        lesson: &Lesson,
        old_status: LessonStatus,
        old_price: Decimal,
    ) -> Result<(), LessonError> {
        let outcome = BillingOutcome::for_transition(
            old_status,
            old_price,
            lesson.status,
            lesson.price,
            lesson.topic.as_deref(),
        );

        if outcome.is_no_op() {
            tracing::debug!(
                "No billing effect for lesson {} ({} -> {})",
                lesson.id,
                old_status,
                lesson.status
            );
            return Ok(());
        }

        let student = StudentsRepository::lock_by_id(&mut *conn, lesson.student_id).await?;
        let Some(student) = student else {
            tracing::warn!(
                "Skipping billing for lesson {}: student {} not found",
                lesson.id,
                lesson.student_id
            );
            return Ok(());
        };

        sqlx::query("UPDATE students SET balance = balance + $1, updated_at = NOW() WHERE id = $2")
            .bind(outcome.balance_change)
            .bind(student.id)
            .execute(&mut *conn)
            .await?;

        if let Some(entry) = outcome.ledger_entry {
            sqlx::query(
                "INSERT INTO transactions (student_id, amount, comment) VALUES ($1, $2, $3)",
            )
            .bind(student.id)
            .bind(entry.amount)
            .bind(&entry.comment)
            .execute(&mut *conn)
            .await?;
        }

        tracing::info!(
            "Billed lesson {} ({} -> {}): balance change {}",
            lesson.id,
            old_status,
            lesson.status,
            outcome.balance_change
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_planned_to_completed_charges_full_price() {
        // Scenario: balance 0, price 100, planned -> completed
        let outcome = BillingOutcome::for_transition(
            LessonStatus::Planned,
            dec!(100),
            LessonStatus::Completed,
            dec!(100),
            Some("Algebra"),
        );

        assert_eq!(outcome.balance_change, dec!(-100));
        let entry = outcome.ledger_entry.expect("charge must be recorded");
        assert_eq!(entry.amount, dec!(-100));
        assert_eq!(entry.comment, "Lesson conducted on topic: Algebra");
    }

    #[test]
    fn test_completed_to_no_show_refunds_half() {
        // Scenario: completed lesson reclassified as no-show at price 100
        let outcome = BillingOutcome::for_transition(
            LessonStatus::Completed,
            dec!(100),
            LessonStatus::NoShow,
            dec!(100),
            None,
        );

        // old deduction 100, new deduction 50 -> the student gets 50 back
        assert_eq!(outcome.balance_change, dec!(50));
        let entry = outcome.ledger_entry.expect("refund must be recorded");
        assert_eq!(entry.amount, dec!(50));
        assert_eq!(
            entry.comment,
            "Student did not attend (50% of lesson price charged)"
        );
    }

    #[test]
    fn test_planned_to_no_show_charges_half() {
        let outcome = BillingOutcome::for_transition(
            LessonStatus::Planned,
            dec!(100),
            LessonStatus::NoShow,
            dec!(100),
            None,
        );

        assert_eq!(outcome.balance_change, dec!(-50));
        let entry = outcome.ledger_entry.expect("charge must be recorded");
        assert_eq!(entry.amount, dec!(-50));
        assert_eq!(
            entry.comment,
            "Student did not attend (50% of lesson price charged)"
        );
    }

    #[test]
    fn test_planned_to_cancelled_nets_to_zero_without_ledger_entry() {
        let outcome = BillingOutcome::for_transition(
            LessonStatus::Planned,
            dec!(100),
            LessonStatus::Cancelled,
            dec!(100),
            None,
        );

        assert_eq!(outcome.balance_change, Decimal::ZERO);
        assert!(outcome.ledger_entry.is_none());
    }

    #[test]
    fn test_completed_to_cancelled_refunds_full_price() {
        let outcome = BillingOutcome::for_transition(
            LessonStatus::Completed,
            dec!(100),
            LessonStatus::Cancelled,
            dec!(100),
            None,
        );

        assert_eq!(outcome.balance_change, dec!(100));
        let entry = outcome.ledger_entry.expect("refund must be recorded");
        assert_eq!(entry.amount, dec!(100));
        assert_eq!(entry.comment, "Lesson cancelled (refund)");
    }

    #[test]
    fn test_back_to_planned_uses_correction_comment() {
        let outcome = BillingOutcome::for_transition(
            LessonStatus::Completed,
            dec!(100),
            LessonStatus::Planned,
            dec!(100),
            None,
        );

        assert_eq!(outcome.balance_change, dec!(100));
        let entry = outcome.ledger_entry.expect("reversal must be recorded");
        assert_eq!(entry.comment, "Balance correction due to status change");
    }

    #[test]
    fn test_same_status_is_no_op_even_when_price_changes() {
        // Price-only edits never re-bill a settled lesson
        let outcome = BillingOutcome::for_transition(
            LessonStatus::Completed,
            dec!(100),
            LessonStatus::Completed,
            dec!(250),
            Some("Geometry"),
        );

        assert!(outcome.is_no_op());
    }

    #[test]
    fn test_untitled_topic_fallback() {
        let outcome = BillingOutcome::for_transition(
            LessonStatus::Planned,
            dec!(80),
            LessonStatus::Completed,
            dec!(80),
            None,
        );

        assert_eq!(
            outcome.ledger_entry.expect("charge").comment,
            "Lesson conducted on topic: untitled"
        );
    }

    #[test]
    fn test_price_change_together_with_status_change_uses_both_snapshots() {
        // Old deduction uses the old price, new deduction the new price
        let outcome = BillingOutcome::for_transition(
            LessonStatus::Completed,
            dec!(100),
            LessonStatus::NoShow,
            dec!(80),
            None,
        );

        // 100 - 40 = 60 back to the student
        assert_eq!(outcome.balance_change, dec!(60));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn status_strategy() -> impl Strategy<Value = LessonStatus> {
        prop_oneof![
            Just(LessonStatus::Planned),
            Just(LessonStatus::Completed),
            Just(LessonStatus::NoShow),
            Just(LessonStatus::Cancelled),
        ]
    }

    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (0u32..=1_000_000).prop_map(|cents| Decimal::from(cents) / Decimal::from(100))
    }

    /// Idempotence: an unchanged status never moves the balance and
    /// never stages a ledger entry, regardless of price edits.
    #[test]
    fn prop_same_status_is_always_no_op() {
        proptest!(|(
            status in status_strategy(),
            old_price in price_strategy(),
            new_price in price_strategy()
        )| {
            let outcome = BillingOutcome::for_transition(
                status, old_price, status, new_price, Some("any"),
            );
            prop_assert!(outcome.is_no_op());
        });
    }

    /// Conservation: A -> B -> A with constant price nets to zero, and
    /// the staged ledger amounts cancel out exactly.
    #[test]
    fn prop_round_trip_conserves_balance() {
        proptest!(|(
            a in status_strategy(),
            b in status_strategy(),
            price in price_strategy()
        )| {
            let forward = BillingOutcome::for_transition(a, price, b, price, None);
            let backward = BillingOutcome::for_transition(b, price, a, price, None);

            prop_assert_eq!(
                forward.balance_change + backward.balance_change,
                Decimal::ZERO
            );

            let ledger_sum = forward.ledger_entry.map(|e| e.amount).unwrap_or(Decimal::ZERO)
                + backward.ledger_entry.map(|e| e.amount).unwrap_or(Decimal::ZERO);
            prop_assert_eq!(ledger_sum, Decimal::ZERO);
        });
    }

    /// A ledger entry is staged if and only if the balance moves, and
    /// its amount always equals the balance delta.
    #[test]
    fn prop_ledger_entry_matches_balance_change() {
        proptest!(|(
            a in status_strategy(),
            b in status_strategy(),
            old_price in price_strategy(),
            new_price in price_strategy()
        )| {
            let outcome = BillingOutcome::for_transition(a, old_price, b, new_price, None);

            match outcome.ledger_entry {
                Some(entry) => {
                    prop_assert!(!outcome.balance_change.is_zero());
                    prop_assert_eq!(entry.amount, outcome.balance_change);
                }
                None => prop_assert_eq!(outcome.balance_change, Decimal::ZERO),
            }
        });
    }
}
