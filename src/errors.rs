//! Unified error type for the ledger, its storage layer and the HTTP surface.
//!
//! Every variant belongs to exactly one [`ErrorKind`], which is what callers
//! (and the API layer) use to decide how an error is presented.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure (binding sockets, reading files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Integer narrowing failed
    #[error("Integer conversion error: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),

    /// Amount is zero, negative, or above the allowed maximum
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// Offending amount in yen
        amount: i64,
    },

    /// A single input field failed validation
    #[error("Invalid {field}: {message}")]
    InvalidField {
        /// Name of the field as the caller sent it
        field: &'static str,
        /// Human readable reason
        message: String,
    },

    /// Lending shares do not add up to the lending amount
    #[error("Shares add up to {actual} but the lending amount is {expected}")]
    ShareSumMismatch {
        /// Lending amount
        expected: i64,
        /// Sum of the submitted shares
        actual: i64,
    },

    /// Referenced user is not a current member of the group
    #[error("User {user_id} is not a member of group {group_id}")]
    NotGroupMember {
        /// Group being written to
        group_id: i64,
        /// User that is not a member
        user_id: String,
        /// Input field that named the user
        field: &'static str,
    },

    /// Repayment where payer and payee are the same user
    #[error("User {user_id} cannot repay themselves")]
    SelfRepayment {
        /// The user on both sides
        user_id: String,
    },

    /// Unknown user id
    #[error("User not found: {id}")]
    UserNotFound {
        /// Requested id
        id: String,
    },

    /// Unknown group id
    #[error("Group not found: {id}")]
    GroupNotFound {
        /// Requested id
        id: i64,
    },

    /// Unknown lending id
    #[error("Lending not found: {id}")]
    LendingNotFound {
        /// Requested id
        id: i64,
    },

    /// Unknown repayment id
    #[error("Repayment not found: {id}")]
    RepaymentNotFound {
        /// Requested id
        id: i64,
    },

    /// No pending friend request from the given user
    #[error("No pending friend request from {user_id}")]
    FriendRequestNotFound {
        /// Expected requester
        user_id: String,
    },

    /// The write conflicts with current state
    #[error("Conflict: {message}")]
    Conflict {
        /// What conflicted
        message: String,
    },

    /// No valid identity on the request
    #[error("Not authenticated")]
    Unauthenticated,

    /// Identity is known but not allowed to perform the action
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Why the action was refused
        message: String,
    },
}

/// Coarse classification of [`Error`] used for presentation and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; shown inline, never retried
    Validation,
    /// Unknown id
    NotFound,
    /// Conflicting write
    Conflict,
    /// Missing identity
    Unauthenticated,
    /// Identity lacks permission
    Forbidden,
    /// Infrastructure or programming error
    Internal,
}

impl ErrorKind {
    /// Stable lowercase name used in API responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::Internal => "internal",
        }
    }

    /// Whether a client may reasonably retry the same request later.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::NotFound | Self::Conflict | Self::Internal)
    }
}

impl Error {
    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. }
            | Self::InvalidField { .. }
            | Self::ShareSumMismatch { .. }
            | Self::NotGroupMember { .. }
            | Self::SelfRepayment { .. } => ErrorKind::Validation,
            Self::UserNotFound { .. }
            | Self::GroupNotFound { .. }
            | Self::LendingNotFound { .. }
            | Self::RepaymentNotFound { .. }
            | Self::FriendRequestNotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_)
            | Self::IntConversion(_) => ErrorKind::Internal,
        }
    }

    /// Input field a validation error should be attached to, if any.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidField { field, .. } => Some(*field),
            Self::InvalidAmount { .. } => Some("amount"),
            Self::ShareSumMismatch { .. } => Some("shares"),
            Self::NotGroupMember { field, .. } => Some(*field),
            Self::SelfRepayment { .. } => Some("payee_id"),
            _ => None,
        }
    }

    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
