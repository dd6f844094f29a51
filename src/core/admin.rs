//! Reset, bootstrap, and reconciliation procedures (SPEC_FULL.md §4.4).
//!
//! These are operator/startup-triggered, not part of the per-request hot
//! path; they share the same `FastCoordinator`/`DurableOrderLog` pair the
//! [`AdmissionPipeline`](crate::core::pipeline::AdmissionPipeline) uses.

use std::sync::Arc;

use tracing::{info, warn};

use crate::core::durable_log::DurableOrderLog;
use crate::core::error::PurchaseError;
use crate::core::fast_coordinator::FastCoordinator;
use crate::core::types::SaleId;

pub struct AdminOps<C: FastCoordinator, D: DurableOrderLog> {
    fc: Arc<C>,
    dol: Arc<D>,
}

impl<C: FastCoordinator, D: DurableOrderLog> AdminOps<C, D> {
    pub fn new(fc: Arc<C>, dol: Arc<D>) -> Self {
        Self { fc, dol }
    }

    /// Seeds FC stock from DOL state for every sale this process will
    /// serve. A missing sale is logged and skipped, not fatal — it may be
    /// created later via the admin API.
    pub async fn bootstrap(&self, sale_ids: &[SaleId]) -> Result<(), PurchaseError> {
        for sale_id in sale_ids {
            match self.dol.get_sale(sale_id).await? {
                Some(sale) => {
                    let sold = self.dol.count_success(sale_id).await?;
                    let remaining = (sale.total_stock as i64 - sold).max(0);
                    self.fc.set_stock(sale_id, remaining).await?;
                    info!(%sale_id, remaining, total_stock = sale.total_stock, "bootstrapped fast coordinator stock");
                }
                None => {
                    warn!(%sale_id, "sale not found in durable order log during bootstrap, skipping");
                }
            }
        }
        Ok(())
    }

    /// Full reset: replaces total_stock, deletes all orders, and
    /// reinitialises FC stock and marks from scratch.
    pub async fn reset(&self, sale_id: &SaleId, new_total_stock: u32) -> Result<(), PurchaseError> {
        self.dol.set_total_stock(sale_id, new_total_stock).await?;
        let deleted = self.dol.delete_orders(sale_id).await?;
        self.fc.reset(sale_id).await?;
        self.fc.set_stock(sale_id, new_total_stock as i64).await?;
        info!(%sale_id, new_total_stock, orders_deleted = deleted, "reset sale");
        Ok(())
    }

    /// Recomputes `remaining = total_stock - count_success` from DOL and
    /// overwrites FC. Documented as unsafe under live traffic: a purchase
    /// racing this call can observe a stale or overwritten counter.
    pub async fn reinit_stock(&self, sale_id: &SaleId) -> Result<i64, PurchaseError> {
        let sale = self
            .dol
            .get_sale(sale_id)
            .await?
            .ok_or(PurchaseError::SaleNotFound)?;
        let sold = self.dol.count_success(sale_id).await?;
        let remaining = (sale.total_stock as i64 - sold).max(0);
        self.fc.set_stock(sale_id, remaining).await?;
        warn!(%sale_id, remaining, "reinitialised stock from durable order log; unsafe if called during live traffic");
        Ok(remaining)
    }

    /// Re-marks every SUCCESS user from DOL. Idempotent: re-running after a
    /// partial recovery only re-sets marks that are already set.
    pub async fn recover_user_marks(&self, sale_id: &SaleId) -> Result<usize, PurchaseError> {
        let users = self.dol.list_success_users(sale_id).await?;
        for user_id in &users {
            self.fc.set_mark(sale_id, user_id).await?;
        }
        info!(%sale_id, restored = users.len(), "recovered user marks from durable order log");
        Ok(users.len())
    }
}
