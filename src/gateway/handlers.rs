//! HTTP handlers for the eight purchase-admission operations plus health.
//!
//! Each handler follows `gateway::handlers::transfer`'s shape:
//! `State(state): State<Arc<AppState>>` plus path/body extraction, returning
//! [`ApiResult<T>`]. `user_id` syntax validation happens here, at the
//! boundary — the admission core only ever sees an already-valid `UserId`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::core::{DurableOrderLog, FastCoordinator, PurchaseResult};
use crate::core::types::SaleId;
use crate::gateway::state::AppState;
use crate::gateway::types::{
    ok, ApiError, ApiResult, HealthResponseData, InitStockResponseData, OkResponseData,
    PurchaseRequest, PurchaseResponseData, RecoverMarksResponseData, ResetRequest,
    SaleStatusResponseData, StatsResponseData, UpdateWindowRequest, UpdateWindowResponseData,
    UserPurchaseResponseData,
};

pub async fn purchase<C: FastCoordinator, D: DurableOrderLog>(
    State(state): State<Arc<AppState<C, D>>>,
    Path(sale_id): Path<String>,
    Json(req): Json<PurchaseRequest>,
) -> ApiResult<PurchaseResponseData> {
    let sale_id = SaleId::from(sale_id);
    let user_id = crate::core::types::UserId::parse(&req.user_id)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let result = state.pipeline.purchase(&sale_id, &user_id).await?;

    let (order, remaining_stock) = match &result {
        PurchaseResult::Success(receipt) => {
            (Some(receipt.order.clone()), Some(receipt.remaining_stock))
        }
        _ => (None, None),
    };

    ok(PurchaseResponseData {
        message: result.outcome().to_string(),
        result: result.outcome(),
        order,
        remaining_stock,
    })
}

pub async fn get_user_purchase<C: FastCoordinator, D: DurableOrderLog>(
    State(state): State<Arc<AppState<C, D>>>,
    Path((sale_id, user_id)): Path<(String, String)>,
) -> ApiResult<UserPurchaseResponseData> {
    let sale_id = SaleId::from(sale_id);
    let user_id = crate::core::types::UserId::parse(&user_id)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let order = state.pipeline.get_user_purchase(&sale_id, &user_id).await?;

    ok(UserPurchaseResponseData {
        purchased: order.is_some(),
        order,
    })
}

pub async fn get_sale_status<C: FastCoordinator, D: DurableOrderLog>(
    State(state): State<Arc<AppState<C, D>>>,
    Path(sale_id): Path<String>,
) -> ApiResult<SaleStatusResponseData> {
    let sale_id = SaleId::from(sale_id);

    let (sale, remaining) = state
        .pipeline
        .get_sale_status(&sale_id)
        .await?
        .ok_or_else(|| ApiError::from(crate::core::PurchaseError::SaleNotFound))?;

    let status = sale.status(chrono::Utc::now());

    ok(SaleStatusResponseData {
        sale_id: sale.sale_id.to_string(),
        name: sale.name,
        status,
        remaining_stock: remaining,
        total_stock: sale.total_stock,
        start_time: sale.start_time,
        end_time: sale.end_time,
    })
}

pub async fn get_stats<C: FastCoordinator, D: DurableOrderLog>(
    State(state): State<Arc<AppState<C, D>>>,
    Path(sale_id): Path<String>,
) -> ApiResult<StatsResponseData> {
    let sale_id = SaleId::from(sale_id);
    let purchases = state.pipeline.get_stats(&sale_id).await?;

    ok(StatsResponseData {
        sale_id: sale_id.to_string(),
        purchases,
    })
}

pub async fn reset<C: FastCoordinator, D: DurableOrderLog>(
    State(state): State<Arc<AppState<C, D>>>,
    Path(sale_id): Path<String>,
    Json(req): Json<ResetRequest>,
) -> ApiResult<OkResponseData> {
    let sale_id = SaleId::from(sale_id);
    state.admin.reset(&sale_id, req.stock).await?;
    ok(OkResponseData { ok: true })
}

pub async fn update_window<C: FastCoordinator, D: DurableOrderLog>(
    State(state): State<Arc<AppState<C, D>>>,
    Path(sale_id): Path<String>,
    Json(req): Json<UpdateWindowRequest>,
) -> ApiResult<UpdateWindowResponseData> {
    let sale_id = SaleId::from(sale_id);
    // DOL-only administrative write; the admission core re-derives status
    // from whatever window DOL returns on the next read, so there is
    // nothing further to reconcile in the fast coordinator here.
    let sale = state
        .dol
        .update_window(&sale_id, req.start_time, req.end_time)
        .await?;
    ok(UpdateWindowResponseData { ok: true, sale })
}

pub async fn init_stock<C: FastCoordinator, D: DurableOrderLog>(
    State(state): State<Arc<AppState<C, D>>>,
    Path(sale_id): Path<String>,
) -> ApiResult<InitStockResponseData> {
    let sale_id = SaleId::from(sale_id);
    let initialized_stock = state.admin.reinit_stock(&sale_id).await?;
    ok(InitStockResponseData {
        ok: true,
        initialized_stock,
    })
}

pub async fn recover_marks<C: FastCoordinator, D: DurableOrderLog>(
    State(state): State<Arc<AppState<C, D>>>,
    Path(sale_id): Path<String>,
) -> ApiResult<RecoverMarksResponseData> {
    let sale_id = SaleId::from(sale_id);
    let restored = state.admin.recover_user_marks(&sale_id).await?;
    ok(RecoverMarksResponseData {
        ok: true,
        restored,
    })
}

pub async fn health<C: FastCoordinator, D: DurableOrderLog>(
    State(state): State<Arc<AppState<C, D>>>,
) -> ApiResult<HealthResponseData> {
    let sale_id = SaleId::from(state.default_sale_id.clone());
    let fast_coordinator = state.fc.get_stock(&sale_id).await.is_ok();
    let durable_log = state.dol.get_sale(&sale_id).await.is_ok();

    ok(HealthResponseData {
        durable_log,
        fast_coordinator,
    })
}
