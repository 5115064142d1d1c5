// src/handlers/organizations.rs

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
    models::organizations::{Membership, Organization, OrganizationMember},
    services::organization_service::{NewMember, NewOrganization},
};

// =============================================================================
//  ÁREA 1: ORGANIZAÇÕES DO USUÁRIO (sem x-organization-id)
// =============================================================================

// GET /api/organizations
#[utoipa::path(
    get,
    path = "/api/organizations",
    tag = "Organizations",
    responses((status = 200, description = "Organizações das quais sou membro", body = Vec<Organization>)),
    security(("api_jwt" = []))
)]
pub async fn list_my_organizations(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let organizations = app_state
        .organization_service
        .my_organizations(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(organizations)))
}

// GET /api/organizations/memberships
#[utoipa::path(
    get,
    path = "/api/organizations/memberships",
    tag = "Organizations",
    responses((status = 200, body = Vec<Membership>)),
    security(("api_jwt" = []))
)]
pub async fn list_my_memberships(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let memberships = app_state
        .organization_service
        .my_memberships(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(memberships)))
}

// POST /api/organizations
#[utoipa::path(
    post,
    path = "/api/organizations",
    tag = "Organizations",
    request_body = NewOrganization,
    responses(
        (status = 201, description = "Organização criada; o usuário vira dono", body = Organization),
        (status = 409, description = "Slug já em uso")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_organization(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<NewOrganization>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization = app_state
        .organization_service
        .create(&ctx, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(organization)))
}

// =============================================================================
//  ÁREA 2: ORGANIZAÇÃO ATIVA
// =============================================================================

// GET /api/organizations/current
#[utoipa::path(
    get,
    path = "/api/organizations/current",
    tag = "Organizations",
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses((status = 200, body = Organization)),
    security(("api_jwt" = []))
)]
pub async fn get_current_organization(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let organization = app_state
        .organization_service
        .current(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(organization)))
}

// GET /api/organizations/current/members
#[utoipa::path(
    get,
    path = "/api/organizations/current/members",
    tag = "Organizations",
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses((status = 200, body = Vec<OrganizationMember>)),
    security(("api_jwt" = []))
)]
pub async fn list_members(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let members = app_state
        .organization_service
        .members(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(members)))
}

// POST /api/organizations/current/members
#[utoipa::path(
    post,
    path = "/api/organizations/current/members",
    tag = "Organizations",
    request_body = NewMember,
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses(
        (status = 201, body = OrganizationMember),
        (status = 403, description = "Só donos, admins e gestores gerenciam membros")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_member(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<NewMember>,
) -> Result<impl IntoResponse, ApiError> {
    let member = app_state
        .organization_service
        .add_member(&ctx, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(member)))
}

// DELETE /api/organizations/current/members/{user_id}
#[utoipa::path(
    delete,
    path = "/api/organizations/current/members/{user_id}",
    tag = "Organizations",
    params(
        ("user_id" = Uuid, Path, description = "Usuário a remover"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses(
        (status = 204, description = "Removido"),
        (status = 403, description = "Sem permissão para gerenciar membros")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_member(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .organization_service
        .remove_member(&ctx, user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
