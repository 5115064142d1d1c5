// src/services/document_service.rs

use std::path::PathBuf;

use genpdf::{elements, style, Element};
use uuid::Uuid;

use crate::{
    common::{context::RequestContext, error::AppError},
    models::{
        expenses::Expense,
        organizations::Organization,
        reports::ReportWithExpenses,
        status::DisplayStatus,
    },
    services::{organization_service::OrganizationService, report_service::ReportService},
};

fn render_error(e: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

#[derive(Clone)]
pub struct DocumentService {
    reports: ReportService,
    organizations: OrganizationService,
    font_dir: PathBuf,
    font_family: String,
}

impl DocumentService {
    pub fn new(
        reports: ReportService,
        organizations: OrganizationService,
        font_dir: impl Into<PathBuf>,
        font_family: impl Into<String>,
    ) -> Self {
        Self {
            reports,
            organizations,
            font_dir: font_dir.into(),
            font_family: font_family.into(),
        }
    }

    /// PDF do relatório de despesas, pronto para anexar ao reembolso.
    pub async fn report_pdf(&self, ctx: &RequestContext, report_id: Uuid) -> Result<Vec<u8>, AppError> {
        ctx.require_caller()?;

        // 1. Busca os dados
        let (full, organization) = tokio::try_join!(
            self.reports.get(ctx, report_id),
            self.organizations.current(ctx),
        )?;

        // 2. Fontes
        let font_family = genpdf::fonts::from_files(&self.font_dir, &self.font_family, None)
            .map_err(|_| {
                AppError::FontNotFound(format!(
                    "{} em {}",
                    self.font_family,
                    self.font_dir.display()
                ))
            })?;

        render(font_family, &organization, &full)
    }
}

fn render(
    font_family: genpdf::fonts::FontFamily<genpdf::fonts::FontData>,
    organization: &Organization,
    full: &ReportWithExpenses,
) -> Result<Vec<u8>, AppError> {
    let report = &full.report;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(report.title.clone());
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    // --- CABEÇALHO ---
    doc.push(
        elements::Paragraph::new(organization.name.clone())
            .styled(style::Style::new().bold().with_font_size(18)),
    );
    doc.push(elements::Break::new(1.5));
    doc.push(
        elements::Paragraph::new(format!("EXPENSE REPORT: {}", report.title))
            .styled(style::Style::new().bold().with_font_size(14)),
    );
    doc.push(elements::Paragraph::new(format!("Status: {}", report.status.label())));

    if let (Some(start), Some(end)) = (report.period_start, report.period_end) {
        doc.push(elements::Paragraph::new(format!(
            "Period: {} - {}",
            start.format("%d/%m/%Y"),
            end.format("%d/%m/%Y")
        )));
    }
    if let Some(submitted) = report.submitted_at {
        doc.push(elements::Paragraph::new(format!("Submitted: {}", submitted.format("%d/%m/%Y"))));
    }
    if let Some(description) = &report.description {
        doc.push(elements::Paragraph::new(description.clone()).styled(style::Style::new().italic()));
    }

    doc.push(elements::Break::new(2));

    // --- TABELA DE DESPESAS ---
    // Pesos: Data (2), Comerciante (4), Status (2), Valor (2)
    let mut table = elements::TableLayout::new(vec![2, 4, 2, 2]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let style_bold = style::Style::new().bold();
    table
        .row()
        .element(elements::Paragraph::new("Date").styled(style_bold))
        .element(elements::Paragraph::new("Merchant").styled(style_bold))
        .element(elements::Paragraph::new("Status").styled(style_bold))
        .element(elements::Paragraph::new("Amount").styled(style_bold))
        .push()
        .map_err(render_error)?;

    for expense in &full.expenses {
        table
            .row()
            .element(elements::Paragraph::new(expense.expense_date.format("%d/%m/%Y").to_string()))
            .element(elements::Paragraph::new(expense_label(expense)))
            .element(elements::Paragraph::new(expense.status.label()))
            .element(elements::Paragraph::new(format!("{} {:.2}", expense.currency, expense.amount)))
            .push()
            .map_err(render_error)?;
    }

    doc.push(table);
    doc.push(elements::Break::new(2));

    // --- TOTAL ---
    let mut total = elements::Paragraph::new(format!(
        "TOTAL: {} {:.2}",
        report.currency, report.total_amount
    ));
    total.set_alignment(genpdf::Alignment::Right);
    doc.push(total.styled(style::Style::new().bold().with_font_size(12)));

    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(render_error)?;
    Ok(buffer)
}

fn expense_label(expense: &Expense) -> String {
    match &expense.description {
        Some(description) if !description.is_empty() => {
            format!("{} ({})", expense.merchant, description)
        }
        _ => expense.merchant.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gateway::memory::MemoryGateway, services::approval_service::ApprovalService};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn missing_fonts_are_reported() {
        let gw = Arc::new(MemoryGateway::new());
        let (user, org, report) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        gw.seed(
            "expense_reports",
            vec![json!({
                "id": report, "organization_id": org, "user_id": user, "title": "Março",
                "status": "approved", "total_amount": 10.0, "currency": "USD"
            })],
        );
        gw.seed(
            "organizations",
            vec![json!({ "id": org, "name": "Acme", "slug": "acme", "base_currency": "USD" })],
        );

        let reports = ReportService::new(gw.clone(), ApprovalService::new(gw.clone()));
        let organizations = OrganizationService::new(gw.clone());
        let service = DocumentService::new(reports, organizations, "./no-such-fonts", "Roboto");
        let ctx = RequestContext::new(Some(user), Some(org));

        let err = service.report_pdf(&ctx, report).await.unwrap_err();
        assert!(matches!(err, AppError::FontNotFound(_)));
    }

    #[tokio::test]
    async fn needs_an_organization() {
        let gw = Arc::new(MemoryGateway::new());
        let reports = ReportService::new(gw.clone(), ApprovalService::new(gw.clone()));
        let service = DocumentService::new(reports, OrganizationService::new(gw.clone()), "./fonts", "Roboto");

        let ctx = RequestContext::new(Some(Uuid::new_v4()), None);
        assert!(matches!(
            service.report_pdf(&ctx, Uuid::new_v4()).await,
            Err(AppError::NoOrganizationSelected)
        ));
        assert!(gw.calls().is_empty());
    }
}
