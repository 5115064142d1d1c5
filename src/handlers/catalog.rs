// src/handlers/catalog.rs

use axum::Json;

use crate::models::status::StatusCatalog;

// GET /api/statuses
#[utoipa::path(
    get,
    path = "/api/statuses",
    tag = "Catalog",
    responses((status = 200, description = "Rótulos e cores de todos os status", body = StatusCatalog))
)]
pub async fn get_status_catalog() -> Json<StatusCatalog> {
    Json(StatusCatalog::build())
}
