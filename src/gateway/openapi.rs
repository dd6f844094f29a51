//! OpenAPI / Swagger UI documentation surface.
//!
//! Swagger UI: `http://<bind_addr>/docs`
//! OpenAPI JSON: `http://<bind_addr>/api-docs/openapi.json`

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Flashgate Purchase Admission API",
        version = "1.0.0",
        description = "Oversell-proof, one-per-customer, durably recorded flash-sale purchase admission."
    ),
    servers((url = "/", description = "Current server"))
)]
pub struct ApiDoc;
