// src/services/report_service.rs

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        context::{Caller, RequestContext},
        error::{AppError, GatewayResultExt},
    },
    gateway::{decode, decode_rows, Direction, Filter, Gateway, TableQuery, WriteOp},
    models::{
        expenses::Expense,
        reports::{ExpenseReport, ReportStatus, ReportWithExpenses},
    },
    services::approval_service::{ApprovalService, ApprovalTarget},
};

const COMPONENT: &str = "ReportService";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewReport {
    #[validate(length(min = 1, max = 200, message = "O título é obrigatório."))]
    #[schema(example = "Viagem São Paulo - Março")]
    pub title: String,
    pub description: Option<String>,
    #[validate(length(equal = 3, message = "Use o código ISO da moeda (ex: USD)."))]
    #[schema(example = "USD")]
    pub currency: String,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ReportChanges {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
}

fn check_period(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), AppError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            Err(AppError::InvalidInput("period_end must not be before period_start".into()))
        }
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct ReportService {
    gateway: Arc<dyn Gateway>,
    approvals: ApprovalService,
}

impl ReportService {
    pub fn new(gateway: Arc<dyn Gateway>, approvals: ApprovalService) -> Self {
        Self { gateway, approvals }
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        status: Option<ReportStatus>,
    ) -> Result<Vec<ExpenseReport>, AppError> {
        let caller = ctx.require_caller()?;
        let mut query = TableQuery::new("expense_reports")
            .eq_id("organization_id", caller.organization_id)
            .order("created_at", Direction::Desc);
        if let Some(status) = status {
            query = query.eq("status", json!(status));
        }

        let rows = self.gateway.select(&caller.scope(), query).await.logged(COMPONENT, "list")?;
        decode_rows(rows).logged(COMPONENT, "list")
    }

    /// Relatório + despesas, buscados em paralelo.
    pub async fn get(
        &self,
        ctx: &RequestContext,
        report_id: Uuid,
    ) -> Result<ReportWithExpenses, AppError> {
        let caller = ctx.require_caller()?;
        let scope = caller.scope();

        let expenses_query = TableQuery::new("expenses")
            .eq_id("report_id", report_id)
            .order("expense_date", Direction::Asc);

        let (report, expenses) = tokio::try_join!(
            self.gateway.select_one(&scope, self.report_query(&caller, report_id)),
            self.gateway.select(&scope, expenses_query),
        )
        .logged(COMPONENT, "get")?;

        Ok(ReportWithExpenses {
            report: decode(report).logged(COMPONENT, "get")?,
            expenses: decode_rows::<Expense>(expenses).logged(COMPONENT, "get")?,
        })
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        input: NewReport,
    ) -> Result<ExpenseReport, AppError> {
        let caller = ctx.require_caller()?;
        check_period(input.period_start, input.period_end)?;

        let row = json!({
            "organization_id": caller.organization_id,
            "user_id": caller.user_id,
            "title": input.title,
            "description": input.description,
            "currency": input.currency.to_uppercase(),
            "period_start": input.period_start,
            "period_end": input.period_end,
            "status": ReportStatus::Draft,
            "total_amount": 0,
        });
        self.gateway
            .insert(&caller.scope(), "expense_reports", row)
            .await
            .and_then(decode)
            .logged(COMPONENT, "create")
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        report_id: Uuid,
        changes: ReportChanges,
    ) -> Result<ExpenseReport, AppError> {
        let caller = ctx.require_caller()?;
        let current = self.fetch_draft(&caller, report_id).await?;
        check_period(
            changes.period_start.or(current.period_start),
            changes.period_end.or(current.period_end),
        )?;

        let mut patch = Map::new();
        if let Some(title) = changes.title {
            patch.insert("title".into(), Value::from(title));
        }
        if let Some(description) = changes.description {
            patch.insert("description".into(), Value::from(description));
        }
        if let Some(start) = changes.period_start {
            patch.insert("period_start".into(), json!(start));
        }
        if let Some(end) = changes.period_end {
            patch.insert("period_end".into(), json!(end));
        }
        if patch.is_empty() {
            return Ok(current);
        }

        let mut rows = self
            .gateway
            .update(&caller.scope(), "expense_reports", self.key(&caller, report_id), Value::Object(patch))
            .await
            .logged(COMPONENT, "update")?;
        let row = rows.pop().ok_or(AppError::NotFound("Report"))?;
        decode(row).logged(COMPONENT, "update")
    }

    /// Só rascunhos. As despesas voltam a ficar soltas.
    pub async fn delete(&self, ctx: &RequestContext, report_id: Uuid) -> Result<(), AppError> {
        let caller = ctx.require_caller()?;
        self.fetch_draft(&caller, report_id).await?;
        let scope = caller.scope();

        self.gateway
            .update(
                &scope,
                "expenses",
                vec![Filter::id("report_id", report_id)],
                json!({ "report_id": null }),
            )
            .await
            .logged(COMPONENT, "delete")?;

        let deleted = self
            .gateway
            .delete(&scope, "expense_reports", self.key(&caller, report_id))
            .await
            .logged(COMPONENT, "delete")?;
        if deleted == 0 {
            return Err(AppError::NotFound("Report"));
        }
        Ok(())
    }

    pub async fn add_expense(
        &self,
        ctx: &RequestContext,
        report_id: Uuid,
        expense_id: Uuid,
    ) -> Result<Expense, AppError> {
        self.assign(ctx, report_id, expense_id, Some(report_id), "add_expense").await
    }

    pub async fn remove_expense(
        &self,
        ctx: &RequestContext,
        report_id: Uuid,
        expense_id: Uuid,
    ) -> Result<Expense, AppError> {
        self.assign(ctx, report_id, expense_id, None, "remove_expense").await
    }

    async fn assign(
        &self,
        ctx: &RequestContext,
        report_id: Uuid,
        expense_id: Uuid,
        target: Option<Uuid>,
        operation: &'static str,
    ) -> Result<Expense, AppError> {
        let caller = ctx.require_caller()?;
        self.fetch_draft(&caller, report_id).await?;

        let mut filters = vec![
            Filter::id("id", expense_id),
            Filter::id("organization_id", caller.organization_id),
        ];
        // Remover só vale para despesas que estão neste relatório
        if target.is_none() {
            filters.push(Filter::id("report_id", report_id));
        }

        let mut rows = self
            .gateway
            .update(&caller.scope(), "expenses", filters, json!({ "report_id": target }))
            .await
            .logged(COMPONENT, operation)?;
        let row = rows.pop().ok_or(AppError::NotFound("Expense"))?;
        decode(row).logged(COMPONENT, operation)
    }

    pub async fn submit(
        &self,
        ctx: &RequestContext,
        report_id: Uuid,
    ) -> Result<ExpenseReport, AppError> {
        let caller = ctx.require_caller()?;

        let submit = WriteOp::rpc("submit_expense_report", json!({ "p_report_id": report_id }));
        let payload = self
            .approvals
            .submit_with_chain(&caller, submit, ApprovalTarget::Report(report_id))
            .await?;
        tracing::info!("Relatório {} submetido para aprovação", report_id);

        match payload {
            Value::Object(_) => decode(payload).logged(COMPONENT, "submit"),
            _ => self.fetch(&caller, report_id).await,
        }
    }

    pub(crate) async fn fetch(
        &self,
        caller: &Caller,
        report_id: Uuid,
    ) -> Result<ExpenseReport, AppError> {
        self.gateway
            .select_one(&caller.scope(), self.report_query(caller, report_id))
            .await
            .and_then(decode)
            .logged(COMPONENT, "get")
    }

    async fn fetch_draft(&self, caller: &Caller, report_id: Uuid) -> Result<ExpenseReport, AppError> {
        let report = self.fetch(caller, report_id).await?;
        if !report.is_draft() {
            return Err(AppError::InvalidState("Only draft reports can be changed".into()));
        }
        Ok(report)
    }

    fn report_query(&self, caller: &Caller, report_id: Uuid) -> TableQuery {
        TableQuery::new("expense_reports")
            .eq_id("id", report_id)
            .eq_id("organization_id", caller.organization_id)
    }

    fn key(&self, caller: &Caller, report_id: Uuid) -> Vec<Filter> {
        vec![Filter::id("id", report_id), Filter::id("organization_id", caller.organization_id)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{memory::MemoryGateway, GatewayError};

    fn report_row(id: Uuid, org: Uuid, status: &str) -> Value {
        json!({
            "id": id,
            "organization_id": org,
            "user_id": Uuid::new_v4(),
            "title": "Março",
            "status": status,
            "total_amount": 0,
            "currency": "USD"
        })
    }

    fn expense_row(id: Uuid, org: Uuid, report: Option<Uuid>) -> Value {
        json!({
            "id": id,
            "organization_id": org,
            "user_id": Uuid::new_v4(),
            "report_id": report,
            "merchant": "Hotel",
            "amount": 10.0,
            "currency": "USD",
            "expense_date": "2026-03-02",
            "status": "draft"
        })
    }

    fn setup() -> (Arc<MemoryGateway>, ReportService, RequestContext) {
        let gw = Arc::new(MemoryGateway::new());
        let service = ReportService::new(gw.clone(), ApprovalService::new(gw.clone()));
        let ctx = RequestContext::new(Some(Uuid::new_v4()), Some(Uuid::new_v4()));
        (gw, service, ctx)
    }

    #[tokio::test]
    async fn get_includes_report_expenses() {
        let (gw, service, ctx) = setup();
        let org = ctx.organization_id.unwrap();
        let report = Uuid::new_v4();
        gw.seed("expense_reports", vec![report_row(report, org, "draft")]);
        gw.seed(
            "expenses",
            vec![
                expense_row(Uuid::new_v4(), org, Some(report)),
                expense_row(Uuid::new_v4(), org, None),
            ],
        );

        let full = service.get(&ctx, report).await.unwrap();
        assert_eq!(full.report.id, report);
        assert_eq!(full.expenses.len(), 1);
    }

    #[tokio::test]
    async fn add_then_remove_expense() {
        let (gw, service, ctx) = setup();
        let org = ctx.organization_id.unwrap();
        let (report, expense) = (Uuid::new_v4(), Uuid::new_v4());
        gw.seed("expense_reports", vec![report_row(report, org, "draft")]);
        gw.seed("expenses", vec![expense_row(expense, org, None)]);

        let added = service.add_expense(&ctx, report, expense).await.unwrap();
        assert_eq!(added.report_id, Some(report));

        let removed = service.remove_expense(&ctx, report, expense).await.unwrap();
        assert_eq!(removed.report_id, None);
    }

    #[tokio::test]
    async fn submitted_reports_are_locked() {
        let (gw, service, ctx) = setup();
        let report = Uuid::new_v4();
        gw.seed("expense_reports", vec![report_row(report, ctx.organization_id.unwrap(), "submitted")]);

        let err = service.add_expense(&ctx, report, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn submit_opens_chain_for_report() {
        let (gw, service, ctx) = setup();
        let report = Uuid::new_v4();
        let org = ctx.organization_id.unwrap();
        gw.on_rpc("submit_expense_report", move |_| Ok(report_row(report, org, "submitted")));
        gw.on_rpc("create_approval_chain", |_| Ok(Value::Null));

        let submitted = service.submit(&ctx, report).await.unwrap();
        assert_eq!(submitted.status, ReportStatus::Submitted);

        let chain = &gw.rpc_args("create_approval_chain")[0];
        assert_eq!(chain["p_report_id"], json!(report));
        assert_eq!(chain["p_expense_id"], Value::Null);
    }

    #[tokio::test]
    async fn report_stays_draft_when_chain_fails() {
        let (gw, service, ctx) = setup();
        let report = Uuid::new_v4();
        gw.seed("expense_reports", vec![report_row(report, ctx.organization_id.unwrap(), "draft")]);
        gw.on_rpc_writing("submit_expense_report", |_, tables| {
            for row in tables.entry("expense_reports").or_default().iter_mut() {
                row["status"] = json!("submitted");
            }
            Ok(Value::Null)
        });
        gw.on_rpc("create_approval_chain", |_| {
            Err(GatewayError::Rejected { code: None, message: "no approver".into() })
        });

        assert!(service.submit(&ctx, report).await.is_err());
        assert_eq!(gw.rows("expense_reports")[0]["status"], json!("draft"));
    }

    #[tokio::test]
    async fn inverted_period_is_rejected_locally() {
        let (gw, service, ctx) = setup();
        let input = NewReport {
            title: "Março".into(),
            description: None,
            currency: "USD".into(),
            period_start: NaiveDate::from_ymd_opt(2026, 3, 31),
            period_end: NaiveDate::from_ymd_opt(2026, 3, 1),
        };
        assert!(matches!(service.create(&ctx, input).await, Err(AppError::InvalidInput(_))));
        assert!(gw.calls().is_empty());
    }
}
