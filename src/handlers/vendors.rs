// src/handlers/vendors.rs

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
    models::vendors::Vendor,
    services::vendor_service::VendorInput,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VendorSearch {
    /// Trecho do nome
    pub search: Option<String>,
}

// GET /api/vendors
#[utoipa::path(
    get,
    path = "/api/vendors",
    tag = "Vendors",
    params(
        VendorSearch,
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, description = "Fornecedores ativos", body = Vec<Vendor>)),
    security(("api_jwt" = []))
)]
pub async fn list_vendors(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Query(query): Query<VendorSearch>,
) -> Result<impl IntoResponse, ApiError> {
    let vendors = app_state
        .vendor_service
        .list(&ctx, query.search.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(vendors)))
}

// GET /api/vendors/{id}
#[utoipa::path(
    get,
    path = "/api/vendors/{id}",
    tag = "Vendors",
    params(
        ("id" = Uuid, Path, description = "ID do fornecedor"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, body = Vendor), (status = 404, description = "Não encontrado")),
    security(("api_jwt" = []))
)]
pub async fn get_vendor(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let vendor = app_state
        .vendor_service
        .get(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(vendor)))
}

// POST /api/vendors
#[utoipa::path(
    post,
    path = "/api/vendors",
    tag = "Vendors",
    request_body = VendorInput,
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses((status = 201, body = Vendor), (status = 400, description = "Dados inválidos")),
    security(("api_jwt" = []))
)]
pub async fn create_vendor(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<VendorInput>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let vendor = app_state
        .vendor_service
        .create(&ctx, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(vendor)))
}

// PUT /api/vendors/{id}
#[utoipa::path(
    put,
    path = "/api/vendors/{id}",
    tag = "Vendors",
    request_body = VendorInput,
    params(
        ("id" = Uuid, Path, description = "ID do fornecedor"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, body = Vendor)),
    security(("api_jwt" = []))
)]
pub async fn update_vendor(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<VendorInput>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let vendor = app_state
        .vendor_service
        .update(&ctx, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(vendor)))
}

// DELETE /api/vendors/{id}
#[utoipa::path(
    delete,
    path = "/api/vendors/{id}",
    tag = "Vendors",
    params(
        ("id" = Uuid, Path, description = "ID do fornecedor"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, description = "Fornecedor desativado", body = Vendor)),
    security(("api_jwt" = []))
)]
pub async fn deactivate_vendor(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let vendor = app_state
        .vendor_service
        .deactivate(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(vendor)))
}
