// src/handlers/finance.rs
//
// Moedas, impostos e diárias: consultas de apoio, quase todas resolvidas por procedures.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
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
    models::{
        currency::{Conversion, Currency, ExchangeRate},
        per_diem::{MealFlags, PerDiemRate, TripAllowance},
        tax::{TaxCalculation, TaxRate},
    },
    services::tax_service::NewTaxRate,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExchangeRateQuery {
    #[param(example = "USD")]
    pub base: String,
    #[param(example = "BRL")]
    pub target: String,
    /// Hoje quando ausente
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConvertPayload {
    #[schema(example = "120.00")]
    pub amount: Decimal,
    #[schema(example = "EUR")]
    pub from: String,
    #[schema(example = "USD")]
    pub to: String,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CalculateTaxPayload {
    #[schema(example = "100.00")]
    pub amount: Decimal,
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "BR-SP")]
    pub region: String,
    #[schema(example = "sales")]
    pub tax_type: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PerDiemQuery {
    #[param(example = "New York City")]
    pub location: String,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TripAllowancePayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "New York City")]
    pub location: String,
    pub start_date: NaiveDate,
    /// Um item por dia de viagem, na ordem
    #[validate(length(min = 1, message = "Informe pelo menos um dia."))]
    pub days: Vec<MealFlags>,
}

// =============================================================================
//  ÁREA 1: MOEDAS
// =============================================================================

// GET /api/currencies
#[utoipa::path(
    get,
    path = "/api/currencies",
    tag = "Finance",
    responses((status = 200, body = Vec<Currency>)),
    security(("api_jwt" = []))
)]
pub async fn list_currencies(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let currencies = app_state
        .currency_service
        .list(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(currencies)))
}

// GET /api/exchange-rates
#[utoipa::path(
    get,
    path = "/api/exchange-rates",
    tag = "Finance",
    params(ExchangeRateQuery),
    responses(
        (status = 200, body = ExchangeRate),
        (status = 404, description = "Sem cotação para a data")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_exchange_rate(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Query(query): Query<ExchangeRateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rate = app_state
        .currency_service
        .rate(&ctx, &query.base, &query.target, query.date)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(rate)))
}

// POST /api/currencies/convert
#[utoipa::path(
    post,
    path = "/api/currencies/convert",
    tag = "Finance",
    request_body = ConvertPayload,
    responses((status = 200, body = Conversion)),
    security(("api_jwt" = []))
)]
pub async fn convert_amount(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<ConvertPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let conversion = app_state
        .currency_service
        .convert(&ctx, payload.amount, &payload.from, &payload.to, payload.date)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(conversion)))
}

// =============================================================================
//  ÁREA 2: IMPOSTOS
// =============================================================================

// GET /api/tax-rates
#[utoipa::path(
    get,
    path = "/api/tax-rates",
    tag = "Finance",
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses((status = 200, body = Vec<TaxRate>)),
    security(("api_jwt" = []))
)]
pub async fn list_tax_rates(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let rates = app_state
        .tax_service
        .list(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(rates)))
}

// POST /api/tax-rates
#[utoipa::path(
    post,
    path = "/api/tax-rates",
    tag = "Finance",
    request_body = NewTaxRate,
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses((status = 201, body = TaxRate), (status = 400, description = "Alíquota fora de 0..1")),
    security(("api_jwt" = []))
)]
pub async fn create_tax_rate(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<NewTaxRate>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let rate = app_state
        .tax_service
        .create(&ctx, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(rate)))
}

// POST /api/tax/calculate
#[utoipa::path(
    post,
    path = "/api/tax/calculate",
    tag = "Finance",
    request_body = CalculateTaxPayload,
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses((status = 200, body = TaxCalculation)),
    security(("api_jwt" = []))
)]
pub async fn calculate_tax(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<CalculateTaxPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let calculation = app_state
        .tax_service
        .calculate(&ctx, payload.amount, &payload.region, payload.tax_type.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(calculation)))
}

// =============================================================================
//  ÁREA 3: DIÁRIAS
// =============================================================================

// GET /api/per-diem/rate
#[utoipa::path(
    get,
    path = "/api/per-diem/rate",
    tag = "Finance",
    params(PerDiemQuery),
    responses(
        (status = 200, body = PerDiemRate),
        (status = 404, description = "Local sem tabela de diária")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_per_diem_rate(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Query(query): Query<PerDiemQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rate = app_state
        .per_diem_service
        .rate(&ctx, &query.location, query.date)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(rate)))
}

// POST /api/per-diem/allowance
#[utoipa::path(
    post,
    path = "/api/per-diem/allowance",
    tag = "Finance",
    request_body = TripAllowancePayload,
    responses((status = 200, description = "Diária dia a dia", body = TripAllowance)),
    security(("api_jwt" = []))
)]
pub async fn compute_allowance(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<TripAllowancePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let allowance = app_state
        .per_diem_service
        .allowance(&ctx, &payload.location, payload.start_date, payload.days)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(allowance)))
}
