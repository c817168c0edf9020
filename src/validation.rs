// Validation utilities module
// Provides custom validation functions for domain-specific rules

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::lessons::CreateLessonRequest;

/// Validates that a monetary amount (price, default price) is not negative
pub fn validate_non_negative_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price < Decimal::ZERO {
        Err(ValidationError::new("price_must_not_be_negative"))
    } else {
        Ok(())
    }
}

/// Validates that a payment amount is non-zero
///
/// The sign is meaningful: positive tops up the balance, negative
/// records a manual charge/correction. Only an exact zero is rejected.
pub fn validate_nonzero_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_zero() {
        Err(ValidationError::new("amount_must_not_be_zero"))
    } else {
        Ok(())
    }
}

/// Validates that a lesson's time window is well-formed (end after start)
pub fn validate_lesson_window(request: &CreateLessonRequest) -> Result<(), ValidationError> {
    if request.end_time <= request.start_time {
        return Err(ValidationError::new("end_time_must_be_after_start_time"));
    }
    if let Some(repeat_until) = request.repeat_until {
        if repeat_until < request.start_time {
            return Err(ValidationError::new("repeat_until_before_start_time"));
        }
    }
    Ok(())
}
