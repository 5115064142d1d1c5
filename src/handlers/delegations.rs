// src/handlers/delegations.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        context::RequestContext,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::i18n::Locale,
    models::delegation::Delegation,
    services::delegation_service::NewDelegation,
};

// GET /api/delegations/granted
#[utoipa::path(
    get,
    path = "/api/delegations/granted",
    tag = "Delegations",
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses((status = 200, description = "Delegações que concedi", body = Vec<Delegation>)),
    security(("api_jwt" = []))
)]
pub async fn list_granted(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let delegations = app_state
        .delegation_service
        .granted(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(delegations)))
}

// GET /api/delegations/received
#[utoipa::path(
    get,
    path = "/api/delegations/received",
    tag = "Delegations",
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses((status = 200, description = "Delegações que recebi", body = Vec<Delegation>)),
    security(("api_jwt" = []))
)]
pub async fn list_received(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let delegations = app_state
        .delegation_service
        .received(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(delegations)))
}

// POST /api/delegations
#[utoipa::path(
    post,
    path = "/api/delegations",
    tag = "Delegations",
    request_body = NewDelegation,
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses(
        (status = 201, body = Delegation),
        (status = 400, description = "Delegação inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_delegation(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<NewDelegation>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let delegation = app_state
        .delegation_service
        .create(&ctx, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(delegation)))
}

// DELETE /api/delegations/{id}
#[utoipa::path(
    delete,
    path = "/api/delegations/{id}",
    tag = "Delegations",
    params(
        ("id" = Uuid, Path, description = "ID da delegação"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses(
        (status = 200, description = "Revogada", body = Delegation),
        (status = 404, description = "Não encontrada ou não é sua")
    ),
    security(("api_jwt" = []))
)]
pub async fn revoke_delegation(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let delegation = app_state
        .delegation_service
        .revoke(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(delegation)))
}
