//! Error taxonomy for the admission pipeline.
//!
//! Shaped after `internal_transfer::error::TransferError`: one
//! `thiserror::Error` variant per kind from spec §7, a `code()` for
//! machine-readable API errors, and an `http_status()` for the §6 mapping.

use thiserror::Error;

use crate::core::types::SaleStatus;

#[derive(Error, Debug, Clone)]
pub enum PurchaseError {
    #[error("sale not found")]
    SaleNotFound,

    #[error("fast coordinator unavailable: {0}")]
    TransientCoordinator(String),

    #[error("durable order log unavailable: {0}")]
    TransientDurable(String),

    /// Internal-only: surfaces as `ERROR` to callers, handled inline at
    /// admission step 6a and never otherwise propagated.
    #[error("duplicate order for (sale, user)")]
    Duplicate,

    #[error("durable order log fatal error: {0}")]
    FatalDurable(String),

    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleNotActiveReason {
    Upcoming,
    Ended,
}

impl std::fmt::Display for SaleNotActiveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaleNotActiveReason::Upcoming => write!(f, "UPCOMING"),
            SaleNotActiveReason::Ended => write!(f, "ENDED"),
        }
    }
}

impl From<SaleStatus> for SaleNotActiveReason {
    fn from(s: SaleStatus) -> Self {
        match s {
            SaleStatus::Upcoming => SaleNotActiveReason::Upcoming,
            SaleStatus::Ended => SaleNotActiveReason::Ended,
            SaleStatus::Active => unreachable!("ACTIVE sales are not SALE_NOT_ACTIVE"),
        }
    }
}

impl PurchaseError {
    /// Machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            PurchaseError::SaleNotFound => "SALE_NOT_FOUND",
            PurchaseError::TransientCoordinator(_) => "ERROR",
            PurchaseError::TransientDurable(_) => "ERROR",
            PurchaseError::Duplicate => "ALREADY_PURCHASED",
            PurchaseError::FatalDurable(_) => "ERROR",
            PurchaseError::Validation(_) => "VALIDATION_ERROR",
        }
    }

    /// Recommended HTTP status per spec §6.
    pub fn http_status(&self) -> u16 {
        match self {
            PurchaseError::SaleNotFound => 404,
            PurchaseError::Duplicate => 409,
            PurchaseError::TransientCoordinator(_)
            | PurchaseError::TransientDurable(_)
            | PurchaseError::FatalDurable(_) => 500,
            PurchaseError::Validation(_) => 400,
        }
    }
}

impl From<sqlx::Error> for PurchaseError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                PurchaseError::Duplicate
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                PurchaseError::TransientDurable(e.to_string())
            }
            _ => PurchaseError::FatalDurable(e.to_string()),
        }
    }
}
