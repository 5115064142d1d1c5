// src/handlers/subscriptions.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{context::RequestContext, error::ApiError},
    config::AppState,
    middleware::i18n::Locale,
    models::subscriptions::{PlanLimit, PlanLimitCheck, Subscription, SubscriptionPlan},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePlanPayload {
    pub plan_id: Uuid,
}

// GET /api/plans
#[utoipa::path(
    get,
    path = "/api/plans",
    tag = "Subscriptions",
    responses((status = 200, body = Vec<SubscriptionPlan>)),
    security(("api_jwt" = []))
)]
pub async fn list_plans(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let plans = app_state
        .subscription_service
        .list_plans(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(plans)))
}

// GET /api/subscription
#[utoipa::path(
    get,
    path = "/api/subscription",
    tag = "Subscriptions",
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses((status = 200, description = "Assinatura atual (null se não houver)", body = Option<Subscription>)),
    security(("api_jwt" = []))
)]
pub async fn get_subscription(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let subscription = app_state
        .subscription_service
        .current(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(subscription)))
}

// PUT /api/subscription/plan
#[utoipa::path(
    put,
    path = "/api/subscription/plan",
    tag = "Subscriptions",
    request_body = ChangePlanPayload,
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses((status = 200, body = Subscription)),
    security(("api_jwt" = []))
)]
pub async fn change_plan(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<ChangePlanPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let subscription = app_state
        .subscription_service
        .change_plan(&ctx, payload.plan_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(subscription)))
}

// POST /api/subscription/cancel
#[utoipa::path(
    post,
    path = "/api/subscription/cancel",
    tag = "Subscriptions",
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses((status = 200, description = "Cancela ao fim do período", body = Subscription)),
    security(("api_jwt" = []))
)]
pub async fn cancel_subscription(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let subscription = app_state
        .subscription_service
        .cancel_at_period_end(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(subscription)))
}

// GET /api/subscription/limits/{limit}
#[utoipa::path(
    get,
    path = "/api/subscription/limits/{limit}",
    tag = "Subscriptions",
    params(
        ("limit" = PlanLimit, Path, description = "users | expenses_per_month"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, body = PlanLimitCheck)),
    security(("api_jwt" = []))
)]
pub async fn check_limit(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(limit): Path<PlanLimit>,
) -> Result<impl IntoResponse, ApiError> {
    let check = app_state
        .subscription_service
        .check_limit(&ctx, limit)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(check)))
}
