// src/handlers/policies.rs

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
    models::policies::{ExpensePolicy, PolicyEvaluation, PolicyViolation},
    services::policy_service::PolicyInput,
};

// GET /api/policies
#[utoipa::path(
    get,
    path = "/api/policies",
    tag = "Policies",
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses((status = 200, body = Vec<ExpensePolicy>)),
    security(("api_jwt" = []))
)]
pub async fn list_policies(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let policies = app_state
        .policy_service
        .list(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(policies)))
}

// POST /api/policies
#[utoipa::path(
    post,
    path = "/api/policies",
    tag = "Policies",
    request_body = PolicyInput,
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses(
        (status = 201, body = ExpensePolicy),
        (status = 400, description = "Regra incompleta")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_policy(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<PolicyInput>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let policy = app_state
        .policy_service
        .create(&ctx, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(policy)))
}

// PUT /api/policies/{id}
#[utoipa::path(
    put,
    path = "/api/policies/{id}",
    tag = "Policies",
    request_body = PolicyInput,
    params(
        ("id" = Uuid, Path, description = "ID da política"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, body = ExpensePolicy)),
    security(("api_jwt" = []))
)]
pub async fn update_policy(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<PolicyInput>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let policy = app_state
        .policy_service
        .update(&ctx, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(policy)))
}

// DELETE /api/policies/{id}
#[utoipa::path(
    delete,
    path = "/api/policies/{id}",
    tag = "Policies",
    params(
        ("id" = Uuid, Path, description = "ID da política"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 204, description = "Removida")),
    security(("api_jwt" = []))
)]
pub async fn delete_policy(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .policy_service
        .delete(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/expenses/{id}/policy-check
#[utoipa::path(
    post,
    path = "/api/expenses/{id}/policy-check",
    tag = "Policies",
    params(
        ("id" = Uuid, Path, description = "ID da despesa"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, description = "Resultado da avaliação", body = PolicyEvaluation)),
    security(("api_jwt" = []))
)]
pub async fn evaluate_expense(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let evaluation = app_state
        .policy_service
        .evaluate(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(evaluation)))
}

// GET /api/expenses/{id}/violations
#[utoipa::path(
    get,
    path = "/api/expenses/{id}/violations",
    tag = "Policies",
    params(
        ("id" = Uuid, Path, description = "ID da despesa"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, body = Vec<PolicyViolation>)),
    security(("api_jwt" = []))
)]
pub async fn list_violations(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let violations = app_state
        .policy_service
        .violations(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(violations)))
}
