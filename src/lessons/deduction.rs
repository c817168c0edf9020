use rust_decimal::Decimal;

use crate::lessons::LessonStatus;

/// Fraction of the price charged when a student misses a lesson
/// without cancellation notice.
const NO_SHOW_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 1); // 0.5

/// Amount owed by the student for one lesson, determined solely by its
/// status and price.
///
/// - `completed` charges the full price
/// - `no_show` charges half the price
/// - `planned` and `cancelled` charge nothing
///
/// Pure and total over the status set; unknown status text never
/// reaches this function because parsing rejects it at the boundary.
pub fn deduction(status: LessonStatus, price: Decimal) -> Decimal {
    match status {
        LessonStatus::Completed => price,
        LessonStatus::NoShow => price * NO_SHOW_RATE,
        LessonStatus::Planned | LessonStatus::Cancelled => Decimal::ZERO,
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn price_strategy() -> impl Strategy<Value = Decimal> {
        // Prices in cents up to 10_000.00
        (0u32..=1_000_000).prop_map(|cents| Decimal::from(cents) / Decimal::from(100))
    }

    fn status_strategy() -> impl Strategy<Value = LessonStatus> {
        prop_oneof![
            Just(LessonStatus::Planned),
            Just(LessonStatus::Completed),
            Just(LessonStatus::NoShow),
            Just(LessonStatus::Cancelled),
        ]
    }

    /// The deduction is always one of {0, price/2, price}.
    #[test]
    fn prop_deduction_is_one_of_known_amounts() {
        proptest!(|(status in status_strategy(), price in price_strategy())| {
            let amount = deduction(status, price);
            let half = price * Decimal::from_parts(5, 0, 0, false, 1);
            prop_assert!(
                amount == Decimal::ZERO || amount == half || amount == price,
                "unexpected deduction {} for price {}",
                amount,
                price
            );
        });
    }

    /// Monotonic non-decreasing in severity order
    /// planned/cancelled < no_show < completed for any price >= 0.
    #[test]
    fn prop_deduction_monotonic_in_severity() {
        proptest!(|(price in price_strategy())| {
            let planned = deduction(LessonStatus::Planned, price);
            let cancelled = deduction(LessonStatus::Cancelled, price);
            let no_show = deduction(LessonStatus::NoShow, price);
            let completed = deduction(LessonStatus::Completed, price);

            prop_assert_eq!(planned, cancelled);
            prop_assert!(planned <= no_show);
            prop_assert!(no_show <= completed);
        });
    }

    /// Never charges more than the lesson price.
    #[test]
    fn prop_deduction_bounded_by_price() {
        proptest!(|(status in status_strategy(), price in price_strategy())| {
            let amount = deduction(status, price);
            prop_assert!(amount >= Decimal::ZERO);
            prop_assert!(amount <= price);
        });
    }
}
