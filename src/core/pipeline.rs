//! Admission Pipeline (AP): the stateless purchase protocol.
//!
//! Shaped after `internal_transfer::coordinator::TransferCoordinator` — a
//! thin orchestrator holding references to its collaborators (here, a
//! [`FastCoordinator`] and a [`DurableOrderLog`] instead of the coordinator's
//! `ServiceAdapter`s) and driving a fixed sequence of steps with explicit
//! compensation on the failure branches.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::core::durable_log::DurableOrderLog;
use crate::core::error::{PurchaseError, SaleNotActiveReason};
use crate::core::fast_coordinator::FastCoordinator;
use crate::core::types::{
    Order, OrderStatus, PurchaseOutcome, PurchaseReceipt, PurchaseStats, Sale, SaleId, SaleStatus,
    UserId,
};

/// Result of a purchase attempt: every branch of admission step 6 plus the
/// early-exit outcomes from steps 1-4, each carrying the data the gateway
/// needs to render a response.
#[derive(Debug, Clone)]
pub enum PurchaseResult {
    Success(PurchaseReceipt),
    AlreadyPurchased,
    SoldOut,
    SaleNotActive(SaleNotActiveReason),
    SaleNotFound,
}

impl PurchaseResult {
    pub fn outcome(&self) -> PurchaseOutcome {
        match self {
            PurchaseResult::Success(_) => PurchaseOutcome::Success,
            PurchaseResult::AlreadyPurchased => PurchaseOutcome::AlreadyPurchased,
            PurchaseResult::SoldOut => PurchaseOutcome::SoldOut,
            PurchaseResult::SaleNotActive(_) => PurchaseOutcome::SaleNotActive,
            PurchaseResult::SaleNotFound => PurchaseOutcome::SaleNotFound,
        }
    }
}

pub struct AdmissionPipeline<C: FastCoordinator, D: DurableOrderLog> {
    fc: Arc<C>,
    dol: Arc<D>,
}

impl<C: FastCoordinator, D: DurableOrderLog> AdmissionPipeline<C, D> {
    pub fn new(fc: Arc<C>, dol: Arc<D>) -> Self {
        Self { fc, dol }
    }

    /// Runs the full six-step purchase protocol (SPEC_FULL.md §4.3).
    pub async fn purchase(
        &self,
        sale_id: &SaleId,
        user_id: &UserId,
    ) -> Result<PurchaseResult, PurchaseError> {
        // Step 1: sale lookup.
        let sale = match self.dol.get_sale(sale_id).await? {
            Some(sale) => sale,
            None => return Ok(PurchaseResult::SaleNotFound),
        };

        let now = chrono::Utc::now();
        match sale.status(now) {
            SaleStatus::Active => {}
            other => {
                return Ok(PurchaseResult::SaleNotActive(SaleNotActiveReason::from(
                    other,
                )))
            }
        }

        // Step 2: fast user-mark check, falling back to a DOL row check if
        // the Fast Coordinator is unavailable.
        let already_marked = match self.fc.has_mark(sale_id, user_id).await {
            Ok(marked) => marked,
            Err(e) => {
                warn!(error = %e, %sale_id, %user_id, "fast coordinator unavailable at mark check, falling back to DOL");
                self.dol.get_order(sale_id, user_id).await?.is_some()
            }
        };
        if already_marked {
            return Ok(PurchaseResult::AlreadyPurchased);
        }

        // Step 3: atomic stock decrement.
        let new_stock = self.fc.decr_stock(sale_id).await.map_err(|e| {
            error!(error = %e, %sale_id, "fast coordinator unavailable at decrement, no compensation needed");
            e
        })?;

        // Step 4: oversell guard.
        if new_stock < 0 {
            debug!(%sale_id, %user_id, new_stock, "oversell guard tripped, rolling back decrement");
            self.fc.incr_stock(sale_id).await?;
            return Ok(PurchaseResult::SoldOut);
        }

        // Step 5: user-mark write, ahead of the durable insert, to narrow
        // the same-user race window (not itself correctness-critical: the
        // DOL's unique constraint is what actually prevents a double sale).
        self.fc.set_mark(sale_id, user_id).await?;

        // Step 6: durable insert with compensation.
        match self
            .dol
            .insert_order(sale_id, user_id, OrderStatus::Success)
            .await
        {
            Ok(order) => Ok(PurchaseResult::Success(PurchaseReceipt {
                order,
                remaining_stock: new_stock,
            })),
            Err(PurchaseError::Duplicate) => {
                // 6a: another request already owns this mark; do not clear it.
                debug!(%sale_id, %user_id, "duplicate order at insert, rolling back stock only");
                self.fc.incr_stock(sale_id).await?;
                Ok(PurchaseResult::AlreadyPurchased)
            }
            Err(e) => {
                // 6b: transient or fatal DOL error, full compensation.
                warn!(error = %e, %sale_id, %user_id, "durable insert failed, compensating");
                if let Err(compensation_err) = self.fc.incr_stock(sale_id).await {
                    error!(error = %compensation_err, %sale_id, "stock compensation failed");
                }
                if let Err(compensation_err) = self.fc.clear_mark(sale_id, user_id).await {
                    error!(error = %compensation_err, %sale_id, %user_id, "mark compensation failed");
                }
                Err(e)
            }
        }
    }

    pub async fn get_user_purchase(
        &self,
        sale_id: &SaleId,
        user_id: &UserId,
    ) -> Result<Option<Order>, PurchaseError> {
        self.dol.get_order(sale_id, user_id).await
    }

    /// Remaining stock preferentially from FC; falls back to
    /// `total_stock - count_success` (floored at 0) if FC is unavailable.
    pub async fn get_sale_status(&self, sale_id: &SaleId) -> Result<Option<(Sale, i64)>, PurchaseError> {
        let Some(sale) = self.dol.get_sale(sale_id).await? else {
            return Ok(None);
        };

        let remaining = match self.fc.get_stock(sale_id).await {
            Ok(Some(n)) => n,
            Ok(None) | Err(_) => {
                let sold = self.dol.count_success(sale_id).await?;
                (sale.total_stock as i64 - sold).max(0)
            }
        };

        Ok(Some((sale, remaining)))
    }

    pub async fn get_stats(&self, sale_id: &SaleId) -> Result<PurchaseStats, PurchaseError> {
        self.dol.get_stats(sale_id).await
    }
}
