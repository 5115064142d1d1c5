// src/handlers/receipts.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        context::RequestContext,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::i18n::Locale,
    models::receipts::Receipt,
    services::receipt_service::NewReceipt,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReceiptListQuery {
    pub expense_id: Option<Uuid>,
}

// POST /api/receipts
#[utoipa::path(
    post,
    path = "/api/receipts",
    tag = "Receipts",
    request_body = NewReceipt,
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses(
        (status = 201, description = "Comprovante registrado, aguardando OCR", body = Receipt),
        (status = 400, description = "Tipo ou tamanho de arquivo não aceito")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_receipt(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<NewReceipt>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let receipt = app_state
        .receipt_service
        .register(&ctx, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

// GET /api/receipts
#[utoipa::path(
    get,
    path = "/api/receipts",
    tag = "Receipts",
    params(
        ReceiptListQuery,
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, body = Vec<Receipt>)),
    security(("api_jwt" = []))
)]
pub async fn list_receipts(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Query(query): Query<ReceiptListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let receipts = app_state
        .receipt_service
        .list(&ctx, query.expense_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(receipts)))
}

// POST /api/receipts/{id}/attach/{expense_id}
#[utoipa::path(
    post,
    path = "/api/receipts/{id}/attach/{expense_id}",
    tag = "Receipts",
    params(
        ("id" = Uuid, Path, description = "ID do comprovante"),
        ("expense_id" = Uuid, Path, description = "ID da despesa"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, body = Receipt), (status = 404, description = "Não encontrado")),
    security(("api_jwt" = []))
)]
pub async fn attach_receipt(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path((id, expense_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = app_state
        .receipt_service
        .attach(&ctx, id, expense_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(receipt)))
}

// POST /api/receipts/{id}/ocr
#[utoipa::path(
    post,
    path = "/api/receipts/{id}/ocr",
    tag = "Receipts",
    params(
        ("id" = Uuid, Path, description = "ID do comprovante"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 202, description = "OCR solicitado", body = Receipt)),
    security(("api_jwt" = []))
)]
pub async fn request_ocr(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = app_state
        .receipt_service
        .request_ocr(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::ACCEPTED, Json(receipt)))
}
