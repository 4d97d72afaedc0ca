//! Ledger error types.
//!
//! Every failure the ledger reports falls in one of five categories so the
//! boundary can tell a malformed request from a forbidden one, a business
//! refusal, or a transient storage problem.

use thiserror::Error;

use ledgerline_shared::types::{AccountId, Money};

/// Coarse classification of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or missing input, rejected before any store access.
    Validation,
    /// Account missing or not owned by the caller.
    Authorization,
    /// Lookup returned nothing (recipient resolution).
    NotFound,
    /// Request is well-formed but the ledger refuses it.
    BusinessRule,
    /// Storage or transactional failure; nothing was applied.
    Storage,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount rounds to zero at cent precision.
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    /// Amount is negative.
    #[error("Amount cannot be negative")]
    NegativeAmount,

    /// Amount exceeds what a balance column can hold.
    #[error("Amount cannot exceed {max}")]
    AmountTooLarge {
        /// Largest accepted amount.
        max: Money,
    },

    /// Description exceeds the configured length.
    #[error("Description exceeds {max} characters")]
    DescriptionTooLong {
        /// Maximum allowed length.
        max: usize,
    },

    /// Source and destination are the same account.
    #[error("Source and destination accounts must differ")]
    SameAccount,

    /// Idempotency key is empty, too long, or contains unsupported characters.
    #[error("Invalid idempotency key: {0}")]
    InvalidIdempotencyKey(String),

    /// Recipient identifier is empty or malformed.
    #[error("Invalid recipient identifier: {0}")]
    InvalidRecipient(String),

    /// Statement cursor could not be decoded.
    #[error("Invalid statement cursor: {0}")]
    InvalidCursor(String),

    // ========== Authorization Errors ==========
    /// Account does not exist or is not owned by the requesting user.
    #[error("Invalid account access: {0}")]
    InvalidAccountAccess(AccountId),

    // ========== Lookup Errors ==========
    /// No user or receiving account matched the identifier.
    #[error("Recipient not found")]
    RecipientNotFound,

    // ========== Business Rule Errors ==========
    /// Checking/savings balance cannot cover the amount.
    #[error("Insufficient funds in account {account_id}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// The debited account.
        account_id: AccountId,
        /// Balance available.
        available: Money,
        /// Amount requested.
        requested: Money,
    },

    /// Credit account's available credit cannot cover the amount.
    #[error("Insufficient credit in account {account_id}: available {available}, requested {requested}")]
    InsufficientCredit {
        /// The debited account.
        account_id: AccountId,
        /// Credit available.
        available: Money,
        /// Amount requested.
        requested: Money,
    },

    /// Crediting the account would push its balance past the stored precision.
    #[error("Balance limit exceeded for account {0}")]
    BalanceLimitExceeded(AccountId),

    /// Idempotency key was already used for a different request.
    #[error("Idempotency key '{0}' was already used for a different request")]
    IdempotencyConflict(String),

    // ========== Storage Errors ==========
    /// Account changed underneath the unit of work.
    #[error("Concurrent modification detected for account {0}, please retry")]
    ConcurrentModification(AccountId),

    /// A transaction with this idempotency key committed first.
    ///
    /// The engine resolves this into a replay or a conflict; it is not surfaced to callers.
    #[error("Duplicate idempotency key: {0}")]
    DuplicateIdempotencyKey(String),

    /// Storage layer failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    /// Returns the category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ZeroAmount
            | Self::NegativeAmount
            | Self::AmountTooLarge { .. }
            | Self::DescriptionTooLong { .. }
            | Self::SameAccount
            | Self::InvalidIdempotencyKey(_)
            | Self::InvalidRecipient(_)
            | Self::InvalidCursor(_) => ErrorCategory::Validation,
            Self::InvalidAccountAccess(_) => ErrorCategory::Authorization,
            Self::RecipientNotFound => ErrorCategory::NotFound,
            Self::InsufficientFunds { .. }
            | Self::InsufficientCredit { .. }
            | Self::BalanceLimitExceeded(_)
            | Self::IdempotencyConflict(_) => ErrorCategory::BusinessRule,
            Self::ConcurrentModification(_)
            | Self::DuplicateIdempotencyKey(_)
            | Self::Storage(_)
            | Self::Internal(_) => ErrorCategory::Storage,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::AmountTooLarge { .. } => "AMOUNT_TOO_LARGE",
            Self::DescriptionTooLong { .. } => "DESCRIPTION_TOO_LONG",
            Self::SameAccount => "SAME_ACCOUNT",
            Self::InvalidIdempotencyKey(_) => "INVALID_IDEMPOTENCY_KEY",
            Self::InvalidRecipient(_) => "INVALID_RECIPIENT",
            Self::InvalidCursor(_) => "INVALID_CURSOR",
            Self::InvalidAccountAccess(_) => "INVALID_ACCOUNT_ACCESS",
            Self::RecipientNotFound => "RECIPIENT_NOT_FOUND",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InsufficientCredit { .. } => "INSUFFICIENT_CREDIT",
            Self::BalanceLimitExceeded(_) => "BALANCE_LIMIT_EXCEEDED",
            Self::IdempotencyConflict(_) => "IDEMPOTENCY_CONFLICT",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::DuplicateIdempotencyKey(_) => "DUPLICATE_IDEMPOTENCY_KEY",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::Validation => 400,
            ErrorCategory::Authorization => 403,
            ErrorCategory::NotFound => 404,
            ErrorCategory::BusinessRule => 422,
            ErrorCategory::Storage => match self {
                Self::ConcurrentModification(_) | Self::DuplicateIdempotencyKey(_) => 409,
                Self::Storage(_) => 503,
                _ => 500,
            },
        }
    }

    /// Returns true if the caller may safely retry the request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification(_) | Self::DuplicateIdempotencyKey(_) | Self::Storage(_)
        )
    }
}
