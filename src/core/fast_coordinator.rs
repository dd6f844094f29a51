//! Fast Coordinator (FC): atomic stock counters and per-(sale,user) marks.
//!
//! The trait boundary and `async_trait` shape mirror
//! `internal_transfer::adapters::ServiceAdapter` — one production
//! implementation (here, an in-process `dashmap` store, since this crate
//! carries no external in-memory KV client in its dependency lineage; see
//! DESIGN.md) and, for tests, a lighter double built the same way
//! `internal_transfer::adapters::mock::MockAdapter` fakes `ServiceAdapter`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::core::error::PurchaseError;
use crate::core::types::{SaleId, UserId};

/// Fast Coordinator contract (spec §4.1). Every operation is atomic and
/// linearisable with respect to other callers; no ordering guarantee is
/// offered *between* distinct operations.
#[async_trait]
pub trait FastCoordinator: Send + Sync {
    /// Unconditional write. Used by bootstrap and reset only.
    async fn set_stock(&self, sale: &SaleId, n: i64) -> Result<(), PurchaseError>;

    async fn get_stock(&self, sale: &SaleId) -> Result<Option<i64>, PurchaseError>;

    /// Atomic decrement; may return a negative value (spec §9: do not clamp).
    async fn decr_stock(&self, sale: &SaleId) -> Result<i64, PurchaseError>;

    /// Atomic increment; used for rollback/compensation.
    async fn incr_stock(&self, sale: &SaleId) -> Result<i64, PurchaseError>;

    async fn has_mark(&self, sale: &SaleId, user: &UserId) -> Result<bool, PurchaseError>;

    /// Idempotent; (re)sets the mark's TTL to the configured expiry.
    async fn set_mark(&self, sale: &SaleId, user: &UserId) -> Result<(), PurchaseError>;

    async fn clear_mark(&self, sale: &SaleId, user: &UserId) -> Result<(), PurchaseError>;

    /// Deletes the stock key and all marks for a sale.
    async fn reset(&self, sale: &SaleId) -> Result<(), PurchaseError>;
}

/// In-process realization of the Fast Coordinator contract.
///
/// Backed by a `DashMap<SaleId, AtomicI64>` for stock counters — the same
/// lock-free CAS pattern `api_auth::TsStore` uses for per-key atomic state —
/// and a `DashMap<(SaleId, UserId), Instant>` of mark expiry times, swept
/// periodically by [`InMemoryCoordinator::sweep_expired`].
///
/// Horizontally scaling this service across processes would mean swapping
/// this type for a client of a real shared store behind the same
/// `FastCoordinator` trait; nothing above this module would change.
pub struct InMemoryCoordinator {
    stock: DashMap<SaleId, AtomicI64>,
    marks: DashMap<(SaleId, UserId), Instant>,
    mark_ttl: Duration,
}

impl InMemoryCoordinator {
    pub fn new(mark_ttl: Duration) -> Self {
        Self {
            stock: DashMap::new(),
            marks: DashMap::new(),
            mark_ttl,
        }
    }

    /// Drop marks whose TTL has elapsed. Intended to run on an interval from
    /// a background task; advisory only, same as the marks themselves — a
    /// swept-too-early mark can never cause an oversell, only an unnecessary
    /// DOL round-trip at step 2's fallback.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        self.marks.retain(|_, expires_at| *expires_at > now);
    }

    pub fn mark_count(&self) -> usize {
        self.marks.len()
    }
}

#[async_trait]
impl FastCoordinator for InMemoryCoordinator {
    async fn set_stock(&self, sale: &SaleId, n: i64) -> Result<(), PurchaseError> {
        self.stock.insert(sale.clone(), AtomicI64::new(n));
        Ok(())
    }

    async fn get_stock(&self, sale: &SaleId) -> Result<Option<i64>, PurchaseError> {
        Ok(self.stock.get(sale).map(|v| v.load(Ordering::SeqCst)))
    }

    async fn decr_stock(&self, sale: &SaleId) -> Result<i64, PurchaseError> {
        let entry = self
            .stock
            .entry(sale.clone())
            .or_insert_with(|| AtomicI64::new(0));
        Ok(entry.fetch_sub(1, Ordering::SeqCst) - 1)
    }

    async fn incr_stock(&self, sale: &SaleId) -> Result<i64, PurchaseError> {
        let entry = self
            .stock
            .entry(sale.clone())
            .or_insert_with(|| AtomicI64::new(0));
        Ok(entry.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn has_mark(&self, sale: &SaleId, user: &UserId) -> Result<bool, PurchaseError> {
        let key = (sale.clone(), user.clone());
        match self.marks.get(&key) {
            Some(expires_at) => Ok(*expires_at > Instant::now()),
            None => Ok(false),
        }
    }

    async fn set_mark(&self, sale: &SaleId, user: &UserId) -> Result<(), PurchaseError> {
        self.marks
            .insert((sale.clone(), user.clone()), Instant::now() + self.mark_ttl);
        Ok(())
    }

    async fn clear_mark(&self, sale: &SaleId, user: &UserId) -> Result<(), PurchaseError> {
        self.marks.remove(&(sale.clone(), user.clone()));
        Ok(())
    }

    async fn reset(&self, sale: &SaleId) -> Result<(), PurchaseError> {
        self.stock.remove(sale);
        self.marks.retain(|(s, _), _| s != sale);
        Ok(())
    }
}
