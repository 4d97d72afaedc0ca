//! Request validation performed before any store access.

use rust_decimal::Decimal;

use ledgerline_shared::types::{AccountId, Money};

use super::error::LedgerError;

/// Longest accepted idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Longest accepted recipient identifier.
pub const MAX_RECIPIENT_LEN: usize = 254;

/// Rounds `amount` to cents and checks it is strictly positive and storable.
///
/// # Errors
///
/// Returns `NegativeAmount` for negative input, `ZeroAmount` when the
/// rounded value is zero (e.g. `0.004`) and `AmountTooLarge` above [`Money::MAX`].
pub fn validate_amount(amount: Decimal) -> Result<Money, LedgerError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LedgerError::NegativeAmount);
    }
    let money = Money::from_decimal(amount);
    if !money.is_positive() {
        return Err(LedgerError::ZeroAmount);
    }
    if !money.is_storable() {
        return Err(LedgerError::AmountTooLarge { max: Money::MAX });
    }
    Ok(money)
}

/// Trims the description and checks its length in characters.
///
/// Blank descriptions become `None`.
///
/// # Errors
///
/// Returns `DescriptionTooLong` when the trimmed text exceeds `max_len`.
pub fn validate_description(
    description: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, LedgerError> {
    let Some(text) = description.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if text.chars().count() > max_len {
        return Err(LedgerError::DescriptionTooLong { max: max_len });
    }
    Ok(Some(text.to_string()))
}

/// Checks source and destination differ.
///
/// # Errors
///
/// Returns `SameAccount` when they are equal.
pub fn validate_distinct_accounts(source: AccountId, destination: AccountId) -> Result<(), LedgerError> {
    if source == destination {
        return Err(LedgerError::SameAccount);
    }
    Ok(())
}

/// Checks an idempotency key is 1..=128 printable ASCII characters.
///
/// # Errors
///
/// Returns `InvalidIdempotencyKey` otherwise.
pub fn validate_idempotency_key(key: Option<&str>) -> Result<Option<String>, LedgerError> {
    let Some(key) = key else {
        return Ok(None);
    };
    if key.is_empty() {
        return Err(LedgerError::InvalidIdempotencyKey("key is empty".to_string()));
    }
    if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(LedgerError::InvalidIdempotencyKey(format!(
            "key exceeds {MAX_IDEMPOTENCY_KEY_LEN} characters"
        )));
    }
    if !key.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(LedgerError::InvalidIdempotencyKey(
            "key must be printable ASCII without spaces".to_string(),
        ));
    }
    Ok(Some(key.to_string()))
}

/// Trims a recipient identifier and rejects empty or oversized input.
///
/// # Errors
///
/// Returns `InvalidRecipient` for blank input, input over the length limit,
/// or an email-shaped identifier with an empty local part or domain.
pub fn validate_recipient_identifier(identifier: &str) -> Result<&str, LedgerError> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(LedgerError::InvalidRecipient("identifier is empty".to_string()));
    }
    if identifier.len() > MAX_RECIPIENT_LEN {
        return Err(LedgerError::InvalidRecipient(format!(
            "identifier exceeds {MAX_RECIPIENT_LEN} characters"
        )));
    }
    if let Some((local, domain)) = identifier.split_once('@')
        && (local.is_empty() || domain.is_empty())
    {
        return Err(LedgerError::InvalidRecipient(format!(
            "'{identifier}' is not a valid email"
        )));
    }
    Ok(identifier)
}
