// src/handlers/reports.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
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
    models::{
        expenses::Expense,
        reports::{ExpenseReport, ReportStatus, ReportWithExpenses},
    },
    services::report_service::{NewReport, ReportChanges},
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportListQuery {
    pub status: Option<ReportStatus>,
}

// GET /api/reports
#[utoipa::path(
    get,
    path = "/api/reports",
    tag = "Reports",
    params(
        ReportListQuery,
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, body = Vec<ExpenseReport>)),
    security(("api_jwt" = []))
)]
pub async fn list_reports(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Query(query): Query<ReportListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let reports = app_state
        .report_service
        .list(&ctx, query.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(reports)))
}

// GET /api/reports/{id}
#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    tag = "Reports",
    params(
        ("id" = Uuid, Path, description = "ID do relatório"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses(
        (status = 200, description = "Relatório com as despesas", body = ReportWithExpenses),
        (status = 404, description = "Relatório não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_report(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .report_service
        .get(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

// POST /api/reports
#[utoipa::path(
    post,
    path = "/api/reports",
    tag = "Reports",
    request_body = NewReport,
    params(("x-organization-id" = Uuid, Header, description = "ID da organização")),
    responses(
        (status = 201, body = ExpenseReport),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_report(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<NewReport>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let report = app_state
        .report_service
        .create(&ctx, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(report)))
}

// PATCH /api/reports/{id}
#[utoipa::path(
    patch,
    path = "/api/reports/{id}",
    tag = "Reports",
    request_body = ReportChanges,
    params(
        ("id" = Uuid, Path, description = "ID do relatório"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses(
        (status = 200, body = ExpenseReport),
        (status = 409, description = "O relatório não é mais rascunho")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_report(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReportChanges>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let report = app_state
        .report_service
        .update(&ctx, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

// DELETE /api/reports/{id}
#[utoipa::path(
    delete,
    path = "/api/reports/{id}",
    tag = "Reports",
    params(
        ("id" = Uuid, Path, description = "ID do relatório"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses(
        (status = 204, description = "Removido; as despesas voltam a ficar soltas"),
        (status = 409, description = "O relatório não é mais rascunho")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_report(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .report_service
        .delete(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/reports/{id}/expenses/{expense_id}
#[utoipa::path(
    post,
    path = "/api/reports/{id}/expenses/{expense_id}",
    tag = "Reports",
    params(
        ("id" = Uuid, Path, description = "ID do relatório"),
        ("expense_id" = Uuid, Path, description = "ID da despesa"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, description = "Despesa incluída", body = Expense)),
    security(("api_jwt" = []))
)]
pub async fn add_expense(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path((id, expense_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let expense = app_state
        .report_service
        .add_expense(&ctx, id, expense_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(expense)))
}

// DELETE /api/reports/{id}/expenses/{expense_id}
#[utoipa::path(
    delete,
    path = "/api/reports/{id}/expenses/{expense_id}",
    tag = "Reports",
    params(
        ("id" = Uuid, Path, description = "ID do relatório"),
        ("expense_id" = Uuid, Path, description = "ID da despesa"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, description = "Despesa retirada", body = Expense)),
    security(("api_jwt" = []))
)]
pub async fn remove_expense(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path((id, expense_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let expense = app_state
        .report_service
        .remove_expense(&ctx, id, expense_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(expense)))
}

// POST /api/reports/{id}/submit
#[utoipa::path(
    post,
    path = "/api/reports/{id}/submit",
    tag = "Reports",
    params(
        ("id" = Uuid, Path, description = "ID do relatório"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses((status = 200, description = "Enviado para aprovação", body = ExpenseReport)),
    security(("api_jwt" = []))
)]
pub async fn submit_report(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .report_service
        .submit(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

// GET /api/reports/{id}/pdf
#[utoipa::path(
    get,
    path = "/api/reports/{id}/pdf",
    tag = "Reports",
    params(
        ("id" = Uuid, Path, description = "ID do relatório"),
        ("x-organization-id" = Uuid, Header, description = "ID da organização")
    ),
    responses(
        (status = 200, description = "PDF do relatório", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Relatório não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_report_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let pdf_bytes = app_state
        .document_service
        .report_pdf(&ctx, id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    // Configura os Headers para o navegador baixar ou mostrar o PDF
    let disposition = format!("attachment; filename=\"relatorio_{}.pdf\"", id);
    let headers = [
        (header::CONTENT_TYPE, "application/pdf"),
        (header::CONTENT_DISPOSITION, disposition.as_str()),
    ];

    Ok((headers, pdf_bytes).into_response())
}
