//! Core data model: sales, orders, user identifiers, outcome codes.
//!
//! Mirrors the shape of `internal_transfer::types` — validated newtypes with
//! private fields, `#[repr]`-free plain enums for storage-facing codes, and
//! `Display` impls for logging.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable sale identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaleId(pub String);

impl fmt::Display for SaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SaleId {
    fn from(s: &str) -> Self {
        SaleId(s.to_string())
    }
}

impl From<String> for SaleId {
    fn from(s: String) -> Self {
        SaleId(s)
    }
}

/// Opaque, validated buyer identifier.
///
/// Validation rules (enforced by the surrounding collaborator, never by the
/// admission core itself): non-empty, length <= 255, charset
/// `[A-Za-z0-9_-]`. Fields are private to force construction through
/// [`UserId::parse`], the same discipline `account::validation::AssetName`
/// uses for asset symbols.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UserId(String);

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("user_id must not be empty")]
    Empty,
    #[error("user_id length {actual} exceeds maximum of {max}")]
    TooLong { actual: usize, max: usize },
    #[error("user_id contains characters outside [A-Za-z0-9_-]: '{0}'")]
    InvalidCharset(String),
}

impl UserId {
    pub const MAX_LEN: usize = 255;

    pub fn parse(raw: &str) -> Result<Self, UserIdError> {
        if raw.is_empty() {
            return Err(UserIdError::Empty);
        }
        if raw.len() > Self::MAX_LEN {
            return Err(UserIdError::TooLong {
                actual: raw.len(),
                max: Self::MAX_LEN,
            });
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(UserIdError::InvalidCharset(raw.to_string()));
        }
        Ok(UserId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        UserId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Derived status of a sale relative to the current instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SaleStatus {
    Upcoming,
    Active,
    Ended,
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaleStatus::Upcoming => "UPCOMING",
            SaleStatus::Active => "ACTIVE",
            SaleStatus::Ended => "ENDED",
        };
        write!(f, "{s}")
    }
}

impl SaleStatus {
    /// Pure function of current instant and sale window (spec §4.5).
    pub fn derive(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start > now {
            SaleStatus::Upcoming
        } else if now <= end {
            SaleStatus::Active
        } else {
            SaleStatus::Ended
        }
    }
}

/// Sale metadata as stored by the Durable Order Log.
#[derive(Debug, Clone, Serialize)]
pub struct Sale {
    pub sale_id: SaleId,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_stock: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    pub fn status(&self, now: DateTime<Utc>) -> SaleStatus {
        SaleStatus::derive(now, self.start_time, self.end_time)
    }
}

/// Status of a committed (or attempted) order row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum OrderStatus {
    Success = 1,
    Failed = 0,
}

impl OrderStatus {
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(OrderStatus::Success),
            0 => Some(OrderStatus::Failed),
            _ => None,
        }
    }
}

/// A single row in the Durable Order Log.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub order_id: String,
    pub sale_id: SaleId,
    pub user_id: UserId,
    #[serde(skip)]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a `Purchase` call — the sole surface spec.md's admission
/// pipeline returns to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOutcome {
    Success,
    AlreadyPurchased,
    SoldOut,
    SaleNotActive,
    SaleNotFound,
    Error,
}

impl fmt::Display for PurchaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PurchaseOutcome::Success => "SUCCESS",
            PurchaseOutcome::AlreadyPurchased => "ALREADY_PURCHASED",
            PurchaseOutcome::SoldOut => "SOLD_OUT",
            PurchaseOutcome::SaleNotActive => "SALE_NOT_ACTIVE",
            PurchaseOutcome::SaleNotFound => "SALE_NOT_FOUND",
            PurchaseOutcome::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// Successful purchase result: the order plus the stock reading observed at
/// acceptance time.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub order: Order,
    pub remaining_stock: i64,
}

/// Aggregate purchase counters for `GetStats`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PurchaseStats {
    pub success_count: i64,
    pub failed_count: i64,
    pub total_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_accepts_valid_charset() {
        assert!(UserId::parse("buyer_123-A").is_ok());
    }

    #[test]
    fn user_id_rejects_empty() {
        assert_eq!(UserId::parse(""), Err(UserIdError::Empty));
    }

    #[test]
    fn user_id_rejects_too_long() {
        let raw = "a".repeat(256);
        assert_eq!(
            UserId::parse(&raw),
            Err(UserIdError::TooLong {
                actual: 256,
                max: 255
            })
        );
    }

    #[test]
    fn user_id_rejects_bad_charset() {
        assert!(UserId::parse("buyer@example.com").is_err());
    }

    #[test]
    fn sale_status_derivation() {
        let now = Utc::now();
        let past = now - chrono::Duration::hours(1);
        let future = now + chrono::Duration::hours(1);

        assert_eq!(SaleStatus::derive(now, future, future), SaleStatus::Upcoming);
        assert_eq!(SaleStatus::derive(now, past, future), SaleStatus::Active);
        assert_eq!(SaleStatus::derive(now, past, past), SaleStatus::Ended);
        // boundary: now == end_time is still ACTIVE (inclusive window)
        assert_eq!(SaleStatus::derive(now, past, now), SaleStatus::Active);
    }
}
