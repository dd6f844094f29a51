//! Thin axum gateway exposing the admission core's eight operations over
//! HTTP, grounded in `gateway::mod`'s nested-router + `TcpListener` shape.

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::core::{DurableOrderLog, FastCoordinator};
use state::AppState;

pub async fn run_server<C, D>(bind_addr: &str, state: Arc<AppState<C, D>>)
where
    C: FastCoordinator + 'static,
    D: DurableOrderLog + 'static,
{
    let sale_routes = Router::new()
        .route("/purchase", post(handlers::purchase::<C, D>))
        .route(
            "/purchases/{user_id}",
            get(handlers::get_user_purchase::<C, D>),
        )
        .route("/", get(handlers::get_sale_status::<C, D>))
        .route("/stats", get(handlers::get_stats::<C, D>))
        .route("/reset", post(handlers::reset::<C, D>))
        .route("/window", post(handlers::update_window::<C, D>))
        .route("/init-stock", post(handlers::init_stock::<C, D>))
        .route("/recover-marks", post(handlers::recover_marks::<C, D>));

    let app = Router::new()
        .route("/api/v1/health", get(handlers::health::<C, D>))
        .nest("/api/v1/sales/{sale_id}", sale_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()));

    let listener = match TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %bind_addr, "failed to bind gateway listener");
            std::process::exit(1);
        }
    };

    info!(%bind_addr, "gateway listening");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "gateway server error");
        std::process::exit(1);
    }
}
