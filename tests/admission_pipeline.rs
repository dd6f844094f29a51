//! Property and concurrency tests for the admission pipeline, run against
//! the in-memory fakes so the invariants hold without a live Postgres.
//!
//! Mirrors `internal_transfer::integration_tests`'s `TestHarness` pattern:
//! fakes that enforce the same contracts (atomic decrement, unique
//! constraint on insert) as the production adapters.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use flashgate::core::durable_log::InMemoryOrderLog;
use flashgate::core::fast_coordinator::InMemoryCoordinator;
use flashgate::core::types::{Order, OrderStatus, PurchaseStats, Sale, SaleId, UserId};
use flashgate::core::{
    AdminOps, AdmissionPipeline, DurableOrderLog, FastCoordinator, PurchaseError, PurchaseResult,
};

fn user(n: u32) -> UserId {
    UserId::parse(&format!("buyer-{n}")).unwrap()
}

fn seed(dol: &InMemoryOrderLog, sale_id: &SaleId, total_stock: u32) {
    let now = Utc::now();
    dol.seed_sale(Sale {
        sale_id: sale_id.clone(),
        name: "Summer Drop".into(),
        start_time: now - ChronoDuration::hours(1),
        end_time: now + ChronoDuration::hours(1),
        total_stock,
        created_at: now,
        updated_at: now,
    });
}

async fn pipeline_with_stock(
    total_stock: u32,
) -> (
    Arc<AdmissionPipeline<InMemoryCoordinator, InMemoryOrderLog>>,
    SaleId,
) {
    let sale_id = SaleId::from("flash-drop");
    let dol = Arc::new(InMemoryOrderLog::new());
    seed(&dol, &sale_id, total_stock);

    let fc = Arc::new(InMemoryCoordinator::new(Duration::from_secs(86_400)));
    fc.set_stock(&sale_id, total_stock as i64).await.unwrap();

    (Arc::new(AdmissionPipeline::new(fc, dol)), sale_id)
}

/// Scenario: exact stock exhaustion — no overselling, no underselling.
#[tokio::test]
async fn scenario_exact_sellout_under_concurrency() {
    let (pipeline, sale_id) = pipeline_with_stock(30).await;

    let mut handles = Vec::new();
    for i in 0..100u32 {
        let pipeline = pipeline.clone();
        let sale_id = sale_id.clone();
        handles.push(tokio::spawn(async move {
            pipeline.purchase(&sale_id, &user(i)).await.unwrap()
        }));
    }

    let mut successes = 0;
    let mut sold_out = 0;
    for h in handles {
        match h.await.unwrap() {
            PurchaseResult::Success(_) => successes += 1,
            PurchaseResult::SoldOut => sold_out += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    assert_eq!(successes, 30, "admits exactly total_stock purchasers");
    assert_eq!(sold_out, 70);

    let stats = pipeline.get_stats(&sale_id).await.unwrap();
    assert_eq!(stats.success_count, 30);
}

/// Scenario: one customer firing many concurrent requests is admitted once.
#[tokio::test]
async fn scenario_one_per_customer_under_concurrency() {
    let (pipeline, sale_id) = pipeline_with_stock(1000).await;
    let contested_user = user(1);

    let mut handles = Vec::new();
    for _ in 0..50 {
        let pipeline = pipeline.clone();
        let sale_id = sale_id.clone();
        let contested_user = contested_user.clone();
        handles.push(tokio::spawn(async move {
            pipeline.purchase(&sale_id, &contested_user).await.unwrap()
        }));
    }

    let mut success_count = 0;
    for h in handles {
        if matches!(h.await.unwrap(), PurchaseResult::Success(_)) {
            success_count += 1;
        }
    }

    assert_eq!(success_count, 1, "exactly one of the racing requests wins");
    let stats = pipeline.get_stats(&sale_id).await.unwrap();
    assert_eq!(stats.success_count, 1);
}

/// Scenario: a sale outside its window is rejected with the right sub-status.
#[tokio::test]
async fn scenario_sale_not_active() {
    let sale_id = SaleId::from("ended-drop");
    let dol = Arc::new(InMemoryOrderLog::new());
    let now = Utc::now();
    dol.seed_sale(Sale {
        sale_id: sale_id.clone(),
        name: "Ended Drop".into(),
        start_time: now - ChronoDuration::hours(2),
        end_time: now - ChronoDuration::hours(1),
        total_stock: 10,
        created_at: now,
        updated_at: now,
    });
    let fc = Arc::new(InMemoryCoordinator::new(Duration::from_secs(60)));
    let pipeline = AdmissionPipeline::new(fc, dol);

    let result = pipeline.purchase(&sale_id, &user(1)).await.unwrap();
    assert!(matches!(
        result,
        PurchaseResult::SaleNotActive(flashgate::core::error::SaleNotActiveReason::Ended)
    ));
}

/// A `DurableOrderLog` wrapper that fails every `insert_order` call,
/// exercising the admission pipeline's step-6 compensation branch.
struct FailingInsertLog {
    inner: InMemoryOrderLog,
    fail_next_insert: AtomicBool,
}

impl FailingInsertLog {
    fn new(inner: InMemoryOrderLog) -> Self {
        Self {
            inner,
            fail_next_insert: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl DurableOrderLog for FailingInsertLog {
    async fn get_sale(&self, sale_id: &SaleId) -> Result<Option<Sale>, PurchaseError> {
        self.inner.get_sale(sale_id).await
    }

    async fn count_success(&self, sale_id: &SaleId) -> Result<i64, PurchaseError> {
        self.inner.count_success(sale_id).await
    }

    async fn list_success_users(&self, sale_id: &SaleId) -> Result<Vec<UserId>, PurchaseError> {
        self.inner.list_success_users(sale_id).await
    }

    async fn get_order(
        &self,
        sale_id: &SaleId,
        user_id: &UserId,
    ) -> Result<Option<Order>, PurchaseError> {
        self.inner.get_order(sale_id, user_id).await
    }

    async fn insert_order(
        &self,
        sale_id: &SaleId,
        user_id: &UserId,
        status: OrderStatus,
    ) -> Result<Order, PurchaseError> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(PurchaseError::TransientDurable("connection reset".into()));
        }
        self.inner.insert_order(sale_id, user_id, status).await
    }

    async fn get_stats(&self, sale_id: &SaleId) -> Result<PurchaseStats, PurchaseError> {
        self.inner.get_stats(sale_id).await
    }

    async fn set_total_stock(&self, sale_id: &SaleId, total_stock: u32) -> Result<(), PurchaseError> {
        self.inner.set_total_stock(sale_id, total_stock).await
    }

    async fn update_window(
        &self,
        sale_id: &SaleId,
        start_time: Option<chrono::DateTime<Utc>>,
        end_time: Option<chrono::DateTime<Utc>>,
    ) -> Result<Sale, PurchaseError> {
        self.inner.update_window(sale_id, start_time, end_time).await
    }

    async fn delete_orders(&self, sale_id: &SaleId) -> Result<u64, PurchaseError> {
        self.inner.delete_orders(sale_id).await
    }
}

/// Scenario: a durable-log failure at step 6 rolls back the stock decrement
/// and clears the mark, so the same user can retry.
#[tokio::test]
async fn scenario_dol_failure_rolls_back_stock_and_mark() {
    let sale_id = SaleId::from("flaky-drop");
    let inner = InMemoryOrderLog::new();
    seed(&inner, &sale_id, 10);
    let dol = Arc::new(FailingInsertLog::new(inner));
    let fc = Arc::new(InMemoryCoordinator::new(Duration::from_secs(86_400)));
    fc.set_stock(&sale_id, 10).await.unwrap();
    let pipeline = AdmissionPipeline::new(fc.clone(), dol);

    let first_attempt = pipeline.purchase(&sale_id, &user(1)).await;
    assert!(matches!(first_attempt, Err(PurchaseError::TransientDurable(_))));
    assert_eq!(fc.get_stock(&sale_id).await.unwrap(), Some(10), "stock restored");
    assert!(!fc.has_mark(&sale_id, &user(1)).await.unwrap(), "mark cleared");

    let retry = pipeline.purchase(&sale_id, &user(1)).await.unwrap();
    assert!(matches!(retry, PurchaseResult::Success(_)));
}

/// Scenario: the fast coordinator loses all state (process restart, cache
/// flush); `reinit_stock` recomputes the counter and `recover_user_marks`
/// restores marks from the durable log, so a repeat purchase by an
/// already-successful user is still rejected.
#[tokio::test]
async fn scenario_fc_wipe_and_mark_recovery() {
    let (pipeline, sale_id) = pipeline_with_stock(10).await;
    pipeline.purchase(&sale_id, &user(1)).await.unwrap();

    // Simulate an FC wipe: drop in the original fakes and build a fresh,
    // empty coordinator sharing the same DOL.
    let dol = Arc::new(InMemoryOrderLog::new());
    seed(&dol, &sale_id, 10);
    dol.insert_order(&sale_id, &user(1), OrderStatus::Success)
        .await
        .unwrap();
    let fresh_fc = Arc::new(InMemoryCoordinator::new(Duration::from_secs(86_400)));

    let admin = AdminOps::new(fresh_fc.clone(), dol.clone());
    let reinitialised = admin.reinit_stock(&sale_id).await.unwrap();
    assert_eq!(reinitialised, 9, "remaining = total_stock - count_success");
    let restored = admin.recover_user_marks(&sale_id).await.unwrap();
    assert_eq!(restored, 1);

    let fresh_pipeline = AdmissionPipeline::new(fresh_fc, dol);
    let repeat = fresh_pipeline.purchase(&sale_id, &user(1)).await.unwrap();
    assert!(matches!(repeat, PurchaseResult::AlreadyPurchased));
}

/// Scenario: reset is idempotent and fully clears prior sale state.
#[tokio::test]
async fn scenario_reset_is_idempotent() {
    let (pipeline, sale_id) = pipeline_with_stock(5).await;
    for i in 0..5u32 {
        pipeline.purchase(&sale_id, &user(i)).await.unwrap();
    }

    let dol = Arc::new(InMemoryOrderLog::new());
    seed(&dol, &sale_id, 5);
    let fc = Arc::new(InMemoryCoordinator::new(Duration::from_secs(60)));
    let admin = AdminOps::new(fc.clone(), dol.clone());

    admin.reset(&sale_id, 20).await.unwrap();
    admin.reset(&sale_id, 20).await.unwrap();

    assert_eq!(fc.get_stock(&sale_id).await.unwrap(), Some(20));
    assert_eq!(dol.count_success(&sale_id).await.unwrap(), 0);
}

/// Invariant: success-row count never exceeds total_stock, even under heavy
/// contention with a mix of distinct and repeated users.
#[tokio::test]
async fn invariant_never_exceeds_total_stock() {
    let (pipeline, sale_id) = pipeline_with_stock(17).await;

    let mut handles = Vec::new();
    for i in 0..200u32 {
        let pipeline = pipeline.clone();
        let sale_id = sale_id.clone();
        // Each of 40 distinct users attempts 5 times concurrently.
        handles.push(tokio::spawn(async move {
            pipeline.purchase(&sale_id, &user(i % 40)).await.unwrap()
        }));
    }

    let mut admitted_users = HashSet::new();
    for h in handles {
        if let PurchaseResult::Success(receipt) = h.await.unwrap() {
            assert!(admitted_users.insert(receipt.order.user_id.clone()));
        }
    }

    assert!(admitted_users.len() <= 17);
    let stats = pipeline.get_stats(&sale_id).await.unwrap();
    assert_eq!(stats.success_count, admitted_users.len() as i64);
    assert!(stats.success_count <= 17);
}
