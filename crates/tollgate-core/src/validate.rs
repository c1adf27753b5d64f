//! Input validation for consume/grant operations.
//!
//! Validation failures are always caller-fixable and never retried
//! automatically.

use crate::error::{LedgerError, Result};

/// Maximum amount a single operation may move.
pub const MAX_AMOUNT: i64 = 1_000_000;

/// Maximum length of the human-readable reason.
pub const MAX_REASON_LEN: usize = 500;

/// Maximum length of a caller-supplied idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// Validate an operation amount.
///
/// # Errors
///
/// Returns `LedgerError::Validation` unless `1 <= amount <= MAX_AMOUNT`.
pub fn validate_amount(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(LedgerError::Validation(
            "amount must be a positive integer".into(),
        ));
    }
    if amount > MAX_AMOUNT {
        return Err(LedgerError::Validation(format!(
            "amount cannot exceed {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

/// Validate a reason string.
///
/// # Errors
///
/// Returns `LedgerError::Validation` when empty or longer than
/// `MAX_REASON_LEN` characters.
pub fn validate_reason(reason: &str) -> Result<()> {
    if reason.is_empty() {
        return Err(LedgerError::Validation("reason must be provided".into()));
    }
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(LedgerError::Validation(format!(
            "reason cannot exceed {MAX_REASON_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate an idempotency key.
///
/// Every consume/grant call must carry one; the system never silently
/// accepts an operation without it.
///
/// # Errors
///
/// Returns `LedgerError::Validation` when empty or longer than
/// `MAX_IDEMPOTENCY_KEY_LEN` characters.
pub fn validate_idempotency_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(LedgerError::Validation(
            "idempotency_key must be provided".into(),
        ));
    }
    if key.chars().count() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(LedgerError::Validation(format!(
            "idempotency_key cannot exceed {MAX_IDEMPOTENCY_KEY_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_bounds() {
        assert!(validate_amount(1).is_ok());
        assert!(validate_amount(MAX_AMOUNT).is_ok());
        assert!(validate_amount(0).is_err());
        assert!(validate_amount(-5).is_err());
        assert!(validate_amount(MAX_AMOUNT + 1).is_err());
    }

    #[test]
    fn reason_bounds() {
        assert!(validate_reason("use").is_ok());
        assert!(validate_reason("").is_err());
        assert!(validate_reason(&"x".repeat(MAX_REASON_LEN)).is_ok());
        assert!(validate_reason(&"x".repeat(MAX_REASON_LEN + 1)).is_err());
    }

    #[test]
    fn idempotency_key_bounds() {
        assert!(validate_idempotency_key("k1").is_ok());
        assert!(validate_idempotency_key("").is_err());
        assert!(validate_idempotency_key(&"k".repeat(MAX_IDEMPOTENCY_KEY_LEN)).is_ok());
        assert!(validate_idempotency_key(&"k".repeat(MAX_IDEMPOTENCY_KEY_LEN + 1)).is_err());
    }
}
