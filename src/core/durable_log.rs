//! Durable Order Log (DOL): the system of record.
//!
//! `PostgresOrderLog` follows `internal_transfer::db::TransferDb`'s style
//! throughout — plain `sqlx::query()`/`sqlx::query_as()` calls bound with
//! `.bind()`, never the compile-checked `query!`/`query_as!` macros, since
//! those require a live database (or cached `.sqlx` metadata) at build time.
//! `InMemoryOrderLog` is the test double, shaped after
//! `internal_transfer::adapters::mock::MockAdapter`: it enforces the same
//! uniqueness contract as Postgres so property tests exercise real
//! admission-pipeline logic, not a stub.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use cached::proc_macro::cached;
use cached::Return;
use chrono::Utc;
use sqlx::{PgPool, Row};
use ulid::Ulid;

use crate::core::error::PurchaseError;
use crate::core::types::{Order, OrderStatus, PurchaseStats, Sale, SaleId, UserId};

/// Durable Order Log contract (spec §4.2). Every write is transactional and
/// every read reflects committed state; callers treat
/// [`PurchaseError::TransientDurable`] as retryable and
/// [`PurchaseError::FatalDurable`] as not.
#[async_trait]
pub trait DurableOrderLog: Send + Sync {
    async fn get_sale(&self, sale_id: &SaleId) -> Result<Option<Sale>, PurchaseError>;

    async fn count_success(&self, sale_id: &SaleId) -> Result<i64, PurchaseError>;

    async fn list_success_users(&self, sale_id: &SaleId) -> Result<Vec<UserId>, PurchaseError>;

    async fn get_order(
        &self,
        sale_id: &SaleId,
        user_id: &UserId,
    ) -> Result<Option<Order>, PurchaseError>;

    /// Inserts an order with the given status. Enforces the unique
    /// `(sale_id, user_id)` constraint; violations surface as
    /// [`PurchaseError::Duplicate`] (step 6a of the admission protocol),
    /// never as a fatal error. The admission pipeline only ever inserts
    /// `OrderStatus::Success` rows; `Failed` exists for the DOL contract's
    /// own sake (spec §4.2) and for callers outside the purchase protocol
    /// that want to record a rejected attempt durably.
    async fn insert_order(
        &self,
        sale_id: &SaleId,
        user_id: &UserId,
        status: OrderStatus,
    ) -> Result<Order, PurchaseError>;

    async fn get_stats(&self, sale_id: &SaleId) -> Result<PurchaseStats, PurchaseError>;

    async fn set_total_stock(&self, sale_id: &SaleId, total_stock: u32) -> Result<(), PurchaseError>;

    /// Administrative window change. `None` for either bound leaves it
    /// untouched. Fails `SaleNotFound` if the sale does not exist.
    async fn update_window(
        &self,
        sale_id: &SaleId,
        start_time: Option<chrono::DateTime<Utc>>,
        end_time: Option<chrono::DateTime<Utc>>,
    ) -> Result<Sale, PurchaseError>;

    async fn delete_orders(&self, sale_id: &SaleId) -> Result<u64, PurchaseError>;
}

/// Postgres-backed realization. `get_sale` is wrapped by a 5-second TTL
/// cache (`gateway::cache`'s `#[cached]` pattern) since sale metadata
/// changes rarely but is consulted on every purchase attempt.
pub struct PostgresOrderLog {
    pool: PgPool,
}

impl PostgresOrderLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[cached(
    time = 5,
    key = "String",
    convert = r#"{ sale_id.to_string() }"#,
    result = true,
    with_cached_flag = true
)]
async fn cached_get_sale(
    pool: PgPool,
    sale_id: SaleId,
) -> Result<Return<Option<Sale>>, PurchaseError> {
    let row = sqlx::query(
        "SELECT sale_id, name, start_time, end_time, total_stock, created_at, updated_at \
         FROM sales WHERE sale_id = $1",
    )
    .bind(sale_id.to_string())
    .fetch_optional(&pool)
    .await?;

    let sale = row.map(|row| Sale {
        sale_id: SaleId::from(row.get::<String, _>("sale_id")),
        name: row.get("name"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        total_stock: row.get::<i64, _>("total_stock") as u32,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    });

    Ok(Return::new(sale))
}

#[async_trait]
impl DurableOrderLog for PostgresOrderLog {
    async fn get_sale(&self, sale_id: &SaleId) -> Result<Option<Sale>, PurchaseError> {
        Ok(cached_get_sale(self.pool.clone(), sale_id.clone()).await?.value)
    }

    async fn count_success(&self, sale_id: &SaleId) -> Result<i64, PurchaseError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM orders WHERE sale_id = $1 AND status = $2",
        )
        .bind(sale_id.to_string())
        .bind(OrderStatus::Success.id())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("n"))
    }

    async fn list_success_users(&self, sale_id: &SaleId) -> Result<Vec<UserId>, PurchaseError> {
        let rows = sqlx::query(
            "SELECT user_id FROM orders WHERE sale_id = $1 AND status = $2",
        )
        .bind(sale_id.to_string())
        .bind(OrderStatus::Success.id())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let raw: String = row.get("user_id");
                UserId::parse(&raw).map_err(|e| PurchaseError::Validation(e.to_string()))
            })
            .collect()
    }

    async fn get_order(
        &self,
        sale_id: &SaleId,
        user_id: &UserId,
    ) -> Result<Option<Order>, PurchaseError> {
        let row = sqlx::query(
            "SELECT order_id, sale_id, user_id, status, created_at \
             FROM orders WHERE sale_id = $1 AND user_id = $2",
        )
        .bind(sale_id.to_string())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row_to_order(&row)).transpose()
    }

    async fn insert_order(
        &self,
        sale_id: &SaleId,
        user_id: &UserId,
        status: OrderStatus,
    ) -> Result<Order, PurchaseError> {
        let order_id = Ulid::new().to_string();
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO orders (order_id, sale_id, user_id, status, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&order_id)
        .bind(sale_id.to_string())
        .bind(user_id.as_str())
        .bind(status.id())
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Order {
                order_id,
                sale_id: sale_id.clone(),
                user_id: user_id.clone(),
                status,
                created_at: now,
            }),
            Err(e) => Err(PurchaseError::from(e)),
        }
    }

    async fn get_stats(&self, sale_id: &SaleId) -> Result<PurchaseStats, PurchaseError> {
        let row = sqlx::query(
            "SELECT \
               COUNT(*) FILTER (WHERE status = $2) AS success_count, \
               COUNT(*) FILTER (WHERE status != $2) AS failed_count, \
               COUNT(*) AS total_count \
             FROM orders WHERE sale_id = $1",
        )
        .bind(sale_id.to_string())
        .bind(OrderStatus::Success.id())
        .fetch_one(&self.pool)
        .await?;

        Ok(PurchaseStats {
            success_count: row.get("success_count"),
            failed_count: row.get("failed_count"),
            total_count: row.get("total_count"),
        })
    }

    async fn set_total_stock(&self, sale_id: &SaleId, total_stock: u32) -> Result<(), PurchaseError> {
        sqlx::query("UPDATE sales SET total_stock = $1, updated_at = $2 WHERE sale_id = $3")
            .bind(total_stock as i64)
            .bind(Utc::now())
            .bind(sale_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_window(
        &self,
        sale_id: &SaleId,
        start_time: Option<chrono::DateTime<Utc>>,
        end_time: Option<chrono::DateTime<Utc>>,
    ) -> Result<Sale, PurchaseError> {
        let row = sqlx::query(
            "UPDATE sales SET \
               start_time = COALESCE($1, start_time), \
               end_time = COALESCE($2, end_time), \
               updated_at = $3 \
             WHERE sale_id = $4 \
             RETURNING sale_id, name, start_time, end_time, total_stock, created_at, updated_at",
        )
        .bind(start_time)
        .bind(end_time)
        .bind(Utc::now())
        .bind(sale_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(PurchaseError::SaleNotFound)?;
        Ok(Sale {
            sale_id: SaleId::from(row.get::<String, _>("sale_id")),
            name: row.get("name"),
            start_time: row.get("start_time"),
            end_time: row.get("end_time"),
            total_stock: row.get::<i64, _>("total_stock") as u32,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    async fn delete_orders(&self, sale_id: &SaleId) -> Result<u64, PurchaseError> {
        let result = sqlx::query("DELETE FROM orders WHERE sale_id = $1")
            .bind(sale_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn row_to_order(row: &sqlx::postgres::PgRow) -> Result<Order, PurchaseError> {
    let sale_id: String = row.get("sale_id");
    let user_id: String = row.get("user_id");
    let status_id: i16 = row.get("status");

    Ok(Order {
        order_id: row.get("order_id"),
        sale_id: SaleId::from(sale_id),
        user_id: UserId::parse(&user_id).map_err(|e| PurchaseError::Validation(e.to_string()))?,
        status: OrderStatus::from_id(status_id)
            .ok_or_else(|| PurchaseError::FatalDurable(format!("unknown order status {status_id}")))?,
        created_at: row.get("created_at"),
    })
}

/// In-memory test double enforcing the same `(sale_id, user_id)` uniqueness
/// contract Postgres would, so tests exercise the pipeline's real
/// compensation branches instead of a stub that always succeeds.
pub struct InMemoryOrderLog {
    sales: Mutex<HashMap<SaleId, Sale>>,
    orders: Mutex<HashMap<(SaleId, UserId), Order>>,
}

impl InMemoryOrderLog {
    pub fn new() -> Self {
        Self {
            sales: Mutex::new(HashMap::new()),
            orders: Mutex::new(HashMap::new()),
        }
    }

    pub fn seed_sale(&self, sale: Sale) {
        self.sales.lock().unwrap().insert(sale.sale_id.clone(), sale);
    }
}

impl Default for InMemoryOrderLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurableOrderLog for InMemoryOrderLog {
    async fn get_sale(&self, sale_id: &SaleId) -> Result<Option<Sale>, PurchaseError> {
        Ok(self.sales.lock().unwrap().get(sale_id).cloned())
    }

    async fn count_success(&self, sale_id: &SaleId) -> Result<i64, PurchaseError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .values()
            .filter(|o| &o.sale_id == sale_id && o.status == OrderStatus::Success)
            .count() as i64)
    }

    async fn list_success_users(&self, sale_id: &SaleId) -> Result<Vec<UserId>, PurchaseError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .values()
            .filter(|o| &o.sale_id == sale_id && o.status == OrderStatus::Success)
            .map(|o| o.user_id.clone())
            .collect())
    }

    async fn get_order(
        &self,
        sale_id: &SaleId,
        user_id: &UserId,
    ) -> Result<Option<Order>, PurchaseError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .get(&(sale_id.clone(), user_id.clone()))
            .cloned())
    }

    async fn insert_order(
        &self,
        sale_id: &SaleId,
        user_id: &UserId,
        status: OrderStatus,
    ) -> Result<Order, PurchaseError> {
        let mut orders = self.orders.lock().unwrap();
        let key = (sale_id.clone(), user_id.clone());
        if orders.contains_key(&key) {
            return Err(PurchaseError::Duplicate);
        }
        let order = Order {
            order_id: Ulid::new().to_string(),
            sale_id: sale_id.clone(),
            user_id: user_id.clone(),
            status,
            created_at: Utc::now(),
        };
        orders.insert(key, order.clone());
        Ok(order)
    }

    async fn get_stats(&self, sale_id: &SaleId) -> Result<PurchaseStats, PurchaseError> {
        let orders = self.orders.lock().unwrap();
        let matching: Vec<_> = orders.values().filter(|o| &o.sale_id == sale_id).collect();
        let success_count = matching
            .iter()
            .filter(|o| o.status == OrderStatus::Success)
            .count() as i64;
        let total_count = matching.len() as i64;
        Ok(PurchaseStats {
            success_count,
            failed_count: total_count - success_count,
            total_count,
        })
    }

    async fn set_total_stock(&self, sale_id: &SaleId, total_stock: u32) -> Result<(), PurchaseError> {
        let mut sales = self.sales.lock().unwrap();
        if let Some(sale) = sales.get_mut(sale_id) {
            sale.total_stock = total_stock;
            sale.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_window(
        &self,
        sale_id: &SaleId,
        start_time: Option<chrono::DateTime<Utc>>,
        end_time: Option<chrono::DateTime<Utc>>,
    ) -> Result<Sale, PurchaseError> {
        let mut sales = self.sales.lock().unwrap();
        let sale = sales.get_mut(sale_id).ok_or(PurchaseError::SaleNotFound)?;
        if let Some(start_time) = start_time {
            sale.start_time = start_time;
        }
        if let Some(end_time) = end_time {
            sale.end_time = end_time;
        }
        sale.updated_at = Utc::now();
        Ok(sale.clone())
    }

    async fn delete_orders(&self, sale_id: &SaleId) -> Result<u64, PurchaseError> {
        let mut orders = self.orders.lock().unwrap();
        let before = orders.len();
        orders.retain(|(s, _), _| s != sale_id);
        Ok((before - orders.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sale_id() -> SaleId {
        SaleId::from("summer-drop")
    }

    fn user(n: u32) -> UserId {
        UserId::parse(&format!("buyer-{n}")).unwrap()
    }

    fn seeded_log() -> InMemoryOrderLog {
        let log = InMemoryOrderLog::new();
        let now = Utc::now();
        log.seed_sale(Sale {
            sale_id: sale_id(),
            name: "Summer Drop".into(),
            start_time: now - Duration::hours(1),
            end_time: now + Duration::hours(1),
            total_stock: 100,
            created_at: now,
            updated_at: now,
        });
        log
    }

    #[tokio::test]
    async fn insert_order_rejects_duplicate() {
        let log = seeded_log();
        log.insert_order(&sale_id(), &user(1), OrderStatus::Success)
            .await
            .unwrap();

        let result = log
            .insert_order(&sale_id(), &user(1), OrderStatus::Success)
            .await;
        assert!(matches!(result, Err(PurchaseError::Duplicate)));
    }

    #[tokio::test]
    async fn count_success_reflects_inserts() {
        let log = seeded_log();
        log.insert_order(&sale_id(), &user(1), OrderStatus::Success)
            .await
            .unwrap();
        log.insert_order(&sale_id(), &user(2), OrderStatus::Success)
            .await
            .unwrap();

        assert_eq!(log.count_success(&sale_id()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn get_stats_counts_failed_orders_separately() {
        let log = seeded_log();
        log.insert_order(&sale_id(), &user(1), OrderStatus::Success)
            .await
            .unwrap();
        log.insert_order(&sale_id(), &user(2), OrderStatus::Failed)
            .await
            .unwrap();

        let stats = log.get_stats(&sale_id()).await.unwrap();
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.failed_count, 1);
        assert_eq!(stats.total_count, 2);
    }

    #[tokio::test]
    async fn delete_orders_scopes_to_sale() {
        let log = seeded_log();
        let other = SaleId::from("other-sale");
        log.seed_sale(Sale {
            sale_id: other.clone(),
            name: "Other".into(),
            start_time: Utc::now() - Duration::hours(1),
            end_time: Utc::now() + Duration::hours(1),
            total_stock: 10,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });

        log.insert_order(&sale_id(), &user(1), OrderStatus::Success)
            .await
            .unwrap();
        log.insert_order(&other, &user(1), OrderStatus::Success)
            .await
            .unwrap();

        let deleted = log.delete_orders(&sale_id()).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(log.count_success(&sale_id()).await.unwrap(), 0);
        assert_eq!(log.count_success(&other).await.unwrap(), 1);
    }
}
