//! API response envelope and request/response DTOs.
//!
//! `ApiResponse<T>` / `ApiResult<T>` / `ApiError` follow
//! `gateway::types::response` exactly: `{code: 0, msg: "ok", data}` on
//! success, a non-zero code and `data: null` on error.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::core::error::PurchaseError;
use crate::core::types::{Order, PurchaseOutcome, PurchaseStats, SaleStatus};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

pub type ApiResult<T> =
    Result<(StatusCode, Json<ApiResponse<T>>), (StatusCode, Json<ApiResponse<()>>)>;

#[inline]
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// Unified gateway error, built from a [`PurchaseError`] or raised directly
/// by validation at the boundary (e.g. a malformed `user_id`).
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
    }

    pub fn into_err<T>(self) -> ApiResult<T> {
        Err((
            self.status,
            Json(ApiResponse::<()>::error(error_code(self.code), self.message)),
        ))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(ApiResponse::<()>::error(error_code(self.code), self.message));
        (self.status, body).into_response()
    }
}

impl From<PurchaseError> for ApiError {
    fn from(err: PurchaseError) -> Self {
        let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, err.code(), err.to_string())
    }
}

/// Enables `?` on `ApiError` inside handlers returning `ApiResult<T>`.
impl From<ApiError> for (StatusCode, Json<ApiResponse<()>>) {
    fn from(err: ApiError) -> Self {
        (
            err.status,
            Json(ApiResponse::<()>::error(error_code(err.code), err.message)),
        )
    }
}

/// Enables `?` directly on a `PurchaseError` inside handlers.
impl From<PurchaseError> for (StatusCode, Json<ApiResponse<()>>) {
    fn from(err: PurchaseError) -> Self {
        ApiError::from(err).into()
    }
}

/// Numeric error code alongside the string `code()` from `PurchaseError`,
/// following `gateway::types::response::error_codes`'s client/server-error
/// range split.
fn error_code(code: &str) -> i32 {
    match code {
        "VALIDATION_ERROR" => 1001,
        "SALE_NOT_ACTIVE" => 1002,
        "SALE_NOT_FOUND" => 4001,
        "ALREADY_PURCHASED" => 4091,
        "SOLD_OUT" => 4101,
        "ERROR" => 5000,
        _ => 5000,
    }
}

// ---------------------------------------------------------------------------
// Request / response DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponseData {
    pub result: PurchaseOutcome,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_stock: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UserPurchaseResponseData {
    pub purchased: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

#[derive(Debug, Serialize)]
pub struct SaleStatusResponseData {
    pub sale_id: String,
    pub name: String,
    pub status: SaleStatus,
    pub remaining_stock: i64,
    pub total_stock: u32,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponseData {
    pub sale_id: String,
    pub purchases: PurchaseStats,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub stock: u32,
}

#[derive(Debug, Serialize)]
pub struct OkResponseData {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWindowRequest {
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
pub struct UpdateWindowResponseData {
    pub ok: bool,
    pub sale: crate::core::types::Sale,
}

#[derive(Debug, Serialize)]
pub struct InitStockResponseData {
    pub ok: bool,
    pub initialized_stock: i64,
}

#[derive(Debug, Serialize)]
pub struct RecoverMarksResponseData {
    pub ok: bool,
    pub restored: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponseData {
    pub durable_log: bool,
    pub fast_coordinator: bool,
}
