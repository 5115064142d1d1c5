// src/handlers/expenses.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        context::RequestContext,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::i18n::Locale,
    models::expenses::{
        DuplicateCandidate, Expense, ExpenseCategory, ExpenseFilter, ExpenseSplit, SplitItem,
    },
    services::expense_service::{ExpenseChanges, NewCategory, NewExpense},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SplitExpensePayload {
    pub items: Vec<SplitItem>,
}

// =============================================================================
//  ÁREA 1: DESPESAS
// =============================================================================

// GET /api/expenses
#[utoipa::path(
    get,
    path = "/api/expenses",
    tag = "Expenses",
    params(
        ExpenseFilter,
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses(
        (status = 200, description = "Despesas da organização, mais recentes primeiro", body = Vec<Expense>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_expenses(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Query(filter): Query<ExpenseFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let expenses = app_state
        .expense_service
        .list(&ctx, filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(expenses)))
}

// GET /api/expenses/{id}
#[utoipa::path(
    get,
    path = "/api/expenses/{id}",
    tag = "Expenses",
    params(
        ("id" = Uuid, Path, description = "ID da despesa"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses(
        (status = 200, body = Expense),
        (status = 404, description = "Despesa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_expense(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let expense = app_state
        .expense_service
        .get(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(expense)))
}

// POST /api/expenses
#[utoipa::path(
    post,
    path = "/api/expenses",
    tag = "Expenses",
    request_body = NewExpense,
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses(
        (status = 201, description = "Despesa criada como rascunho", body = Expense),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_expense(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<NewExpense>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let expense = app_state
        .expense_service
        .create(&ctx, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(expense)))
}

// PATCH /api/expenses/{id}
#[utoipa::path(
    patch,
    path = "/api/expenses/{id}",
    tag = "Expenses",
    request_body = ExpenseChanges,
    params(
        ("id" = Uuid, Path, description = "ID da despesa"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses(
        (status = 200, body = Expense),
        (status = 409, description = "A despesa não é mais rascunho")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_expense(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExpenseChanges>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let expense = app_state
        .expense_service
        .update(&ctx, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(expense)))
}

// DELETE /api/expenses/{id}
#[utoipa::path(
    delete,
    path = "/api/expenses/{id}",
    tag = "Expenses",
    params(
        ("id" = Uuid, Path, description = "ID da despesa"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses(
        (status = 204, description = "Removida"),
        (status = 409, description = "A despesa não é mais rascunho")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_expense(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .expense_service
        .delete(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/expenses/{id}/submit
#[utoipa::path(
    post,
    path = "/api/expenses/{id}/submit",
    tag = "Expenses",
    params(
        ("id" = Uuid, Path, description = "ID da despesa"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses(
        (status = 200, description = "Enviada e com cadeia de aprovação criada", body = Expense)
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_expense(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let expense = app_state
        .expense_service
        .submit(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(expense)))
}

// =============================================================================
//  ÁREA 2: RATEIO E DUPLICADAS
// =============================================================================

// PUT /api/expenses/{id}/splits
#[utoipa::path(
    put,
    path = "/api/expenses/{id}/splits",
    tag = "Expenses",
    request_body = SplitExpensePayload,
    params(
        ("id" = Uuid, Path, description = "ID da despesa"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses(
        (status = 200, description = "Rateio substituído", body = Vec<ExpenseSplit>),
        (status = 400, description = "A soma não bate com o total da despesa")
    ),
    security(("api_jwt" = []))
)]
pub async fn split_expense(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<SplitExpensePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let splits = app_state
        .expense_service
        .split(&ctx, id, payload.items)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(splits)))
}

// GET /api/expenses/{id}/splits
#[utoipa::path(
    get,
    path = "/api/expenses/{id}/splits",
    tag = "Expenses",
    params(
        ("id" = Uuid, Path, description = "ID da despesa"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, body = Vec<ExpenseSplit>)),
    security(("api_jwt" = []))
)]
pub async fn list_splits(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let splits = app_state
        .expense_service
        .list_splits(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(splits)))
}

// GET /api/expenses/{id}/duplicates
#[utoipa::path(
    get,
    path = "/api/expenses/{id}/duplicates",
    tag = "Expenses",
    params(
        ("id" = Uuid, Path, description = "ID da despesa"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, description = "Possíveis duplicadas", body = Vec<DuplicateCandidate>)),
    security(("api_jwt" = []))
)]
pub async fn detect_duplicates(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let candidates = app_state
        .expense_service
        .detect_duplicates(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(candidates)))
}

// =============================================================================
//  ÁREA 3: CATEGORIAS
// =============================================================================

// GET /api/expense-categories
#[utoipa::path(
    get,
    path = "/api/expense-categories",
    tag = "Expenses",
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses((status = 200, body = Vec<ExpenseCategory>)),
    security(("api_jwt" = []))
)]
pub async fn list_categories(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let categories = app_state
        .expense_service
        .list_categories(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(categories)))
}

// POST /api/expense-categories
#[utoipa::path(
    post,
    path = "/api/expense-categories",
    tag = "Expenses",
    request_body = NewCategory,
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses(
        (status = 201, body = ExpenseCategory),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<NewCategory>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let category = app_state
        .expense_service
        .create_category(&ctx, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(category)))
}
