// src/handlers/approvals.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        context::RequestContext,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::i18n::Locale,
    models::approvals::{
        ApprovalDecision, ApprovalStats, ApprovalStatus, ApprovalWithDetails, ApprovalWorkflow,
        NewWorkflow, WorkflowWithSteps,
    },
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ApprovalHistoryQuery {
    pub status: Option<ApprovalStatus>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct ApprovePayload {
    #[validate(length(max = 2000))]
    #[schema(example = "Ok, dentro da política.")]
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RejectPayload {
    #[validate(length(min = 1, max = 2000, message = "Informe o motivo da rejeição."))]
    #[schema(example = "Falta o comprovante.")]
    pub reason: String,
}

// =============================================================================
//  ÁREA 1: FILA E HISTÓRICO
// =============================================================================

// GET /api/approvals/pending
#[utoipa::path(
    get,
    path = "/api/approvals/pending",
    tag = "Approvals",
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses(
        (status = 200, description = "Aprovações esperando por mim", body = Vec<ApprovalWithDetails>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_pending(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let approvals = app_state
        .approval_service
        .pending_for_me(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(approvals)))
}

// GET /api/approvals
#[utoipa::path(
    get,
    path = "/api/approvals",
    tag = "Approvals",
    params(
        ApprovalHistoryQuery,
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, body = Vec<ApprovalWithDetails>)),
    security(("api_jwt" = []))
)]
pub async fn list_history(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Query(query): Query<ApprovalHistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let approvals = app_state
        .approval_service
        .history(&ctx, query.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(approvals)))
}

// GET /api/approvals/stats
#[utoipa::path(
    get,
    path = "/api/approvals/stats",
    tag = "Approvals",
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses((status = 200, body = ApprovalStats)),
    security(("api_jwt" = []))
)]
pub async fn get_stats(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let stats = app_state
        .approval_service
        .stats(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(stats)))
}

// GET /api/approvals/{id}
#[utoipa::path(
    get,
    path = "/api/approvals/{id}",
    tag = "Approvals",
    params(
        ("id" = Uuid, Path, description = "ID da aprovação"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses(
        (status = 200, body = ApprovalWithDetails),
        (status = 404, description = "Aprovação não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_approval(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let approval = app_state
        .approval_service
        .get(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(approval)))
}

// =============================================================================
//  ÁREA 2: DECISÕES
// =============================================================================

// POST /api/approvals/{id}/approve
#[utoipa::path(
    post,
    path = "/api/approvals/{id}/approve",
    tag = "Approvals",
    request_body = ApprovePayload,
    params(
        ("id" = Uuid, Path, description = "ID da aprovação"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses(
        (status = 200, body = ApprovalDecision),
        (status = 422, description = "Recusado pelo backend (ex: não é o aprovador da etapa)")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApprovePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let decision = app_state
        .approval_service
        .approve(&ctx, id, payload.comments)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(decision)))
}

// POST /api/approvals/{id}/reject
#[utoipa::path(
    post,
    path = "/api/approvals/{id}/reject",
    tag = "Approvals",
    request_body = RejectPayload,
    params(
        ("id" = Uuid, Path, description = "ID da aprovação"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses(
        (status = 200, body = ApprovalDecision),
        (status = 400, description = "Motivo em branco")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let decision = app_state
        .approval_service
        .reject(&ctx, id, &payload.reason)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(decision)))
}

// =============================================================================
//  ÁREA 3: FLUXOS DE APROVAÇÃO
// =============================================================================

// GET /api/approval-workflows
#[utoipa::path(
    get,
    path = "/api/approval-workflows",
    tag = "Approvals",
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses((status = 200, body = Vec<ApprovalWorkflow>)),
    security(("api_jwt" = []))
)]
pub async fn list_workflows(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let workflows = app_state
        .approval_service
        .list_workflows(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(workflows)))
}

// GET /api/approval-workflows/{id}
#[utoipa::path(
    get,
    path = "/api/approval-workflows/{id}",
    tag = "Approvals",
    params(
        ("id" = Uuid, Path, description = "ID do fluxo"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, description = "Fluxo com as etapas", body = WorkflowWithSteps)),
    security(("api_jwt" = []))
)]
pub async fn get_workflow(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let workflow = app_state
        .approval_service
        .get_workflow(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(workflow)))
}

// POST /api/approval-workflows
#[utoipa::path(
    post,
    path = "/api/approval-workflows",
    tag = "Approvals",
    request_body = NewWorkflow,
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses(
        (status = 201, body = WorkflowWithSteps),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_workflow(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<NewWorkflow>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let workflow = app_state
        .approval_service
        .create_workflow(&ctx, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(workflow)))
}

// DELETE /api/approval-workflows/{id}
#[utoipa::path(
    delete,
    path = "/api/approval-workflows/{id}",
    tag = "Approvals",
    params(
        ("id" = Uuid, Path, description = "ID do fluxo"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, description = "Fluxo desativado", body = ApprovalWorkflow)),
    security(("api_jwt" = []))
)]
pub async fn deactivate_workflow(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let workflow = app_state
        .approval_service
        .deactivate_workflow(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(workflow)))
}
