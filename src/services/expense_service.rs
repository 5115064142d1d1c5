// src/services/expense_service.rs

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        context::{Caller, RequestContext},
        error::{AppError, GatewayResultExt},
    },
    gateway::{decode, decode_rows, Direction, Filter, Gateway, TableQuery, WriteOp},
    models::expenses::{
        DuplicateCandidate, Expense, ExpenseCategory, ExpenseFilter, ExpenseSplit,
        ExpenseStatus, SplitItem,
    },
    services::approval_service::{ApprovalService, ApprovalTarget},
};

const COMPONENT: &str = "ExpenseService";

// =========================================================================
//  RATEIO (validação local)
// =========================================================================

/// Diferença máxima aceita entre o total e a soma das partes.
pub const SPLIT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Debug, Error, PartialEq)]
pub enum SplitValidationError {
    #[error("A split needs at least 2 items")]
    TooFewItems,

    #[error("Split items add up to {actual:.2} but the expense total is {expected:.2}")]
    TotalMismatch { expected: Decimal, actual: Decimal },
}

/// Válido com 2+ itens e soma a até um centavo do total.
pub fn validate_split_total(total: Decimal, items: &[SplitItem]) -> Result<(), SplitValidationError> {
    if items.len() < 2 {
        return Err(SplitValidationError::TooFewItems);
    }

    let sum: Decimal = items.iter().map(|item| item.amount).sum();
    if (total - sum).abs() > SPLIT_TOLERANCE {
        return Err(SplitValidationError::TotalMismatch { expected: total, actual: sum });
    }
    Ok(())
}

// =========================================================================
//  PAYLOADS
// =========================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewExpense {
    #[validate(length(min = 1, max = 200, message = "O comerciante é obrigatório."))]
    #[schema(example = "Uber")]
    pub merchant: String,
    pub description: Option<String>,
    #[schema(example = "42.90")]
    pub amount: Decimal,
    #[validate(length(equal = 3, message = "Use o código ISO da moeda (ex: USD)."))]
    #[schema(example = "USD")]
    pub currency: String,
    pub expense_date: NaiveDate,
    pub category_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub report_id: Option<Uuid>,
    pub receipt_id: Option<Uuid>,
    #[serde(default)]
    pub is_billable: bool,
}

/// Campos ausentes ficam como estão.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ExpenseChanges {
    #[validate(length(min = 1, max = 200))]
    pub merchant: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub expense_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub is_billable: Option<bool>,
}

impl ExpenseChanges {
    fn into_patch(self) -> Value {
        let mut patch = Map::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                patch.insert(key.to_string(), value);
            }
        };
        put("merchant", self.merchant.map(Value::from));
        put("description", self.description.map(Value::from));
        put("amount", self.amount.map(|a| json!(a)));
        put("currency", self.currency.map(Value::from));
        put("expense_date", self.expense_date.map(|d| json!(d)));
        put("category_id", self.category_id.map(|id| json!(id)));
        put("vendor_id", self.vendor_id.map(|id| json!(id)));
        put("is_billable", self.is_billable.map(Value::from));
        Value::Object(patch)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewCategory {
    #[validate(length(min = 1, max = 100, message = "O nome é obrigatório."))]
    #[schema(example = "Viagens")]
    pub name: String,
    #[schema(example = "6100")]
    pub gl_code: Option<String>,
}

// =========================================================================
//  SERVIÇO
// =========================================================================

#[derive(Clone)]
pub struct ExpenseService {
    gateway: Arc<dyn Gateway>,
    approvals: ApprovalService,
}

impl ExpenseService {
    pub fn new(gateway: Arc<dyn Gateway>, approvals: ApprovalService) -> Self {
        Self { gateway, approvals }
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        filter: ExpenseFilter,
    ) -> Result<Vec<Expense>, AppError> {
        let caller = ctx.require_caller()?;

        let mut query = TableQuery::new("expenses")
            .eq_id("organization_id", caller.organization_id)
            .order("expense_date", Direction::Desc);
        if let Some(status) = filter.status {
            query = query.eq("status", json!(status));
        }
        if let Some(from) = filter.from {
            query = query.filter(Filter::Gte("expense_date", json!(from)));
        }
        if let Some(to) = filter.to {
            query = query.filter(Filter::Lte("expense_date", json!(to)));
        }
        if let Some(category_id) = filter.category_id {
            query = query.eq_id("category_id", category_id);
        }
        if let Some(report_id) = filter.report_id {
            query = query.eq_id("report_id", report_id);
        }

        let rows = self.gateway.select(&caller.scope(), query).await.logged(COMPONENT, "list")?;
        decode_rows(rows).logged(COMPONENT, "list")
    }

    pub async fn get(&self, ctx: &RequestContext, expense_id: Uuid) -> Result<Expense, AppError> {
        let caller = ctx.require_caller()?;
        self.fetch(&caller, expense_id).await
    }

    async fn fetch(&self, caller: &Caller, expense_id: Uuid) -> Result<Expense, AppError> {
        let query = TableQuery::new("expenses")
            .eq_id("id", expense_id)
            .eq_id("organization_id", caller.organization_id);
        self.gateway
            .select_one(&caller.scope(), query)
            .await
            .and_then(decode)
            .logged(COMPONENT, "get")
    }

    async fn fetch_draft(&self, caller: &Caller, expense_id: Uuid) -> Result<Expense, AppError> {
        let expense = self.fetch(caller, expense_id).await?;
        if !expense.is_draft() {
            return Err(AppError::InvalidState(format!(
                "Only draft expenses can be changed (current status: {:?})",
                expense.status
            )));
        }
        Ok(expense)
    }

    pub async fn create(&self, ctx: &RequestContext, input: NewExpense) -> Result<Expense, AppError> {
        let caller = ctx.require_caller()?;
        if input.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("Amount must be greater than zero".into()));
        }

        let row = json!({
            "organization_id": caller.organization_id,
            "user_id": caller.user_id,
            "merchant": input.merchant,
            "description": input.description,
            "amount": input.amount,
            "currency": input.currency.to_uppercase(),
            "expense_date": input.expense_date,
            "category_id": input.category_id,
            "vendor_id": input.vendor_id,
            "report_id": input.report_id,
            "receipt_id": input.receipt_id,
            "is_billable": input.is_billable,
            "status": ExpenseStatus::Draft,
        });

        let expense: Expense = self
            .gateway
            .insert(&caller.scope(), "expenses", row)
            .await
            .and_then(decode)
            .logged(COMPONENT, "create")?;

        tracing::info!("Despesa {} criada por {}", expense.id, caller.user_id);
        Ok(expense)
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        expense_id: Uuid,
        changes: ExpenseChanges,
    ) -> Result<Expense, AppError> {
        let caller = ctx.require_caller()?;
        if changes.amount.is_some_and(|a| a <= Decimal::ZERO) {
            return Err(AppError::InvalidInput("Amount must be greater than zero".into()));
        }
        self.fetch_draft(&caller, expense_id).await?;

        let patch = changes.into_patch();
        if patch.as_object().is_some_and(|p| p.is_empty()) {
            return self.fetch(&caller, expense_id).await;
        }

        let mut rows = self
            .gateway
            .update(&caller.scope(), "expenses", self.key(&caller, expense_id), patch)
            .await
            .logged(COMPONENT, "update")?;
        let row = rows.pop().ok_or(AppError::NotFound("Expense"))?;
        decode(row).logged(COMPONENT, "update")
    }

    pub async fn delete(&self, ctx: &RequestContext, expense_id: Uuid) -> Result<(), AppError> {
        let caller = ctx.require_caller()?;
        self.fetch_draft(&caller, expense_id).await?;

        let deleted = self
            .gateway
            .delete(&caller.scope(), "expenses", self.key(&caller, expense_id))
            .await
            .logged(COMPONENT, "delete")?;
        if deleted == 0 {
            return Err(AppError::NotFound("Expense"));
        }
        Ok(())
    }

    /// Submete a despesa e abre a cadeia de aprovação.
    pub async fn submit(&self, ctx: &RequestContext, expense_id: Uuid) -> Result<Expense, AppError> {
        let caller = ctx.require_caller()?;
        let submit = WriteOp::rpc("submit_expense", json!({ "p_expense_id": expense_id }));
        let payload = self
            .approvals
            .submit_with_chain(&caller, submit, ApprovalTarget::Expense(expense_id))
            .await?;
        tracing::info!("Despesa {} submetida para aprovação", expense_id);

        // Algumas versões da procedure não devolvem a linha
        match payload {
            Value::Object(_) => decode(payload).logged(COMPONENT, "submit"),
            _ => self.fetch(&caller, expense_id).await,
        }
    }

    // --- Rateio ---

    /// Substitui o rateio da despesa. A soma precisa bater com o total.
    pub async fn split(
        &self,
        ctx: &RequestContext,
        expense_id: Uuid,
        items: Vec<SplitItem>,
    ) -> Result<Vec<ExpenseSplit>, AppError> {
        let caller = ctx.require_caller()?;
        let expense = self.fetch(&caller, expense_id).await?;
        validate_split_total(expense.amount, &items)?;

        // Apaga o rateio antigo e grava o novo no mesmo lote
        let mut ops = vec![WriteOp::delete(
            "expense_splits",
            vec![Filter::id("expense_id", expense_id)],
        )];
        ops.extend(items.into_iter().map(|item| {
            WriteOp::insert(
                "expense_splits",
                json!({
                    "expense_id": expense_id,
                    "category_id": item.category_id,
                    "amount": item.amount,
                    "description": item.description,
                }),
            )
        }));

        let results = self
            .gateway
            .atomic(&caller.scope(), ops)
            .await
            .logged(COMPONENT, "split")?;
        decode_rows(results.into_iter().skip(1).collect()).logged(COMPONENT, "split")
    }

    pub async fn list_splits(
        &self,
        ctx: &RequestContext,
        expense_id: Uuid,
    ) -> Result<Vec<ExpenseSplit>, AppError> {
        let caller = ctx.require_caller()?;
        let query = TableQuery::new("expense_splits").eq_id("expense_id", expense_id);
        let rows = self.gateway.select(&caller.scope(), query).await.logged(COMPONENT, "list_splits")?;
        decode_rows(rows).logged(COMPONENT, "list_splits")
    }

    pub async fn detect_duplicates(
        &self,
        ctx: &RequestContext,
        expense_id: Uuid,
    ) -> Result<Vec<DuplicateCandidate>, AppError> {
        let caller = ctx.require_caller()?;
        let payload = self
            .gateway
            .rpc(&caller.scope(), "detect_duplicate_expenses", json!({ "p_expense_id": expense_id }))
            .await
            .logged(COMPONENT, "detect_duplicates")?;

        if payload.is_null() {
            return Ok(Vec::new());
        }
        decode(payload).logged(COMPONENT, "detect_duplicates")
    }

    // --- Categorias ---

    pub async fn list_categories(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<ExpenseCategory>, AppError> {
        let caller = ctx.require_caller()?;
        let query = TableQuery::new("expense_categories")
            .eq_id("organization_id", caller.organization_id)
            .eq("is_active", true)
            .order("name", Direction::Asc);
        let rows = self
            .gateway
            .select(&caller.scope(), query)
            .await
            .logged(COMPONENT, "list_categories")?;
        decode_rows(rows).logged(COMPONENT, "list_categories")
    }

    pub async fn create_category(
        &self,
        ctx: &RequestContext,
        input: NewCategory,
    ) -> Result<ExpenseCategory, AppError> {
        let caller = ctx.require_caller()?;
        let row = json!({
            "organization_id": caller.organization_id,
            "name": input.name,
            "gl_code": input.gl_code,
            "is_active": true,
        });
        self.gateway
            .insert(&caller.scope(), "expense_categories", row)
            .await
            .and_then(decode)
            .logged(COMPONENT, "create_category")
    }

    fn key(&self, caller: &Caller, expense_id: Uuid) -> Vec<Filter> {
        vec![Filter::id("id", expense_id), Filter::id("organization_id", caller.organization_id)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{
        memory::{GatewayCall, MemoryGateway},
        GatewayError,
    };

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn items(amounts: &[&str]) -> Vec<SplitItem> {
        amounts
            .iter()
            .map(|a| SplitItem { category_id: None, amount: dec(a), description: None })
            .collect()
    }

    #[test]
    fn split_within_one_cent_is_valid() {
        assert_eq!(validate_split_total(dec("100.00"), &items(&["33.34", "33.33", "33.33"])), Ok(()));
        assert_eq!(validate_split_total(dec("100.00"), &items(&["50.00", "49.99"])), Ok(()));
    }

    #[test]
    fn split_mismatch_mentions_both_totals() {
        let err = validate_split_total(dec("100.00"), &items(&["40", "50"])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("90.00"), "{}", message);
        assert!(message.contains("100.00"), "{}", message);
    }

    #[test]
    fn split_needs_two_items() {
        assert_eq!(
            validate_split_total(dec("100.00"), &items(&["100"])),
            Err(SplitValidationError::TooFewItems)
        );
        assert_eq!(validate_split_total(dec("0"), &[]), Err(SplitValidationError::TooFewItems));
    }

    fn expense_row(id: Uuid, org: Uuid, status: &str, amount: f64) -> Value {
        json!({
            "id": id,
            "organization_id": org,
            "user_id": Uuid::new_v4(),
            "merchant": "Hotel",
            "amount": amount,
            "currency": "USD",
            "expense_date": "2026-03-02",
            "status": status
        })
    }

    fn setup() -> (Arc<MemoryGateway>, ExpenseService, RequestContext) {
        let gw = Arc::new(MemoryGateway::new());
        let approvals = ApprovalService::new(gw.clone());
        let service = ExpenseService::new(gw.clone(), approvals);
        let ctx = RequestContext::new(Some(Uuid::new_v4()), Some(Uuid::new_v4()));
        (gw, service, ctx)
    }

    #[tokio::test]
    async fn preconditions_fail_before_any_call() {
        let (gw, service, _) = setup();
        let no_org = RequestContext::new(Some(Uuid::new_v4()), None);

        assert!(matches!(
            service.list(&no_org, ExpenseFilter::default()).await,
            Err(AppError::NoOrganizationSelected)
        ));
        assert!(matches!(
            service.submit(&RequestContext::default(), Uuid::new_v4()).await,
            Err(AppError::NotAuthenticated)
        ));
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn create_starts_as_draft_for_the_caller() {
        let (gw, service, ctx) = setup();
        let input = NewExpense {
            merchant: "Uber".into(),
            description: None,
            amount: dec("42.90"),
            currency: "usd".into(),
            expense_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            category_id: None,
            vendor_id: None,
            report_id: None,
            receipt_id: None,
            is_billable: false,
        };

        let expense = service.create(&ctx, input).await.unwrap();
        assert_eq!(expense.status, ExpenseStatus::Draft);
        assert_eq!(Some(expense.user_id), ctx.user_id);
        assert_eq!(expense.currency, "USD");
        assert_eq!(gw.rows("expenses").len(), 1);
    }

    #[tokio::test]
    async fn submitted_expenses_cannot_be_edited() {
        let (gw, service, ctx) = setup();
        let id = Uuid::new_v4();
        gw.seed("expenses", vec![expense_row(id, ctx.organization_id.unwrap(), "submitted", 10.0)]);

        let err = service.delete(&ctx, id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(gw.rows("expenses").len(), 1);
    }

    #[tokio::test]
    async fn submit_calls_procedure_then_opens_chain() {
        let (gw, service, ctx) = setup();
        let id = Uuid::new_v4();
        let org = ctx.organization_id.unwrap();
        gw.seed("expenses", vec![expense_row(id, org, "draft", 10.0)]);
        gw.on_rpc("submit_expense", |_| Ok(Value::Null));
        gw.on_rpc("create_approval_chain", |_| Ok(json!({ "id": Uuid::new_v4() })));

        service.submit(&ctx, id).await.unwrap();

        let procedures: Vec<&str> = gw
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::Rpc { procedure, .. } => Some(procedure),
                _ => None,
            })
            .collect();
        assert_eq!(procedures, vec!["submit_expense", "create_approval_chain"]);

        let chain = &gw.rpc_args("create_approval_chain")[0];
        assert_eq!(chain["p_expense_id"], json!(id));
        assert_eq!(chain["p_report_id"], Value::Null);
        assert_eq!(chain["p_organization_id"], json!(org));
    }

    #[tokio::test]
    async fn invalid_split_writes_nothing() {
        let (gw, service, ctx) = setup();
        let id = Uuid::new_v4();
        gw.seed("expenses", vec![expense_row(id, ctx.organization_id.unwrap(), "draft", 100.0)]);

        let err = service.split(&ctx, id, items(&["40", "50"])).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidSplit(_)));
        assert!(gw.rows("expense_splits").is_empty());

        let splits = service.split(&ctx, id, items(&["60", "40"])).await.unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(gw.rows("expense_splits").len(), 2);
    }

    #[tokio::test]
    async fn failed_chain_undoes_the_submission() {
        let (gw, service, ctx) = setup();
        let id = Uuid::new_v4();
        gw.seed("expenses", vec![expense_row(id, ctx.organization_id.unwrap(), "draft", 10.0)]);
        gw.on_rpc_writing("submit_expense", |_, tables| {
            for row in tables.entry("expenses").or_default().iter_mut() {
                row["status"] = json!("submitted");
            }
            Ok(Value::Null)
        });
        gw.on_rpc("create_approval_chain", |_| {
            Err(GatewayError::Rejected { code: Some("P0001".into()), message: "no workflow".into() })
        });

        let err = service.submit(&ctx, id).await.unwrap_err();
        assert!(matches!(err, AppError::Gateway(_)));
        assert_eq!(gw.rows("expenses")[0]["status"], json!("draft"));
        assert_eq!(gw.atomic_batches(), 1);
    }

    #[tokio::test]
    async fn failed_split_keeps_the_previous_one() {
        let (gw, service, ctx) = setup();
        let id = Uuid::new_v4();
        gw.seed("expenses", vec![expense_row(id, ctx.organization_id.unwrap(), "draft", 100.0)]);
        gw.seed(
            "expense_splits",
            vec![
                json!({ "id": Uuid::new_v4(), "expense_id": id, "amount": 50.0 }),
                json!({ "id": Uuid::new_v4(), "expense_id": id, "amount": 50.0 }),
            ],
        );
        gw.fail_inserts_after("expense_splits", 1);

        assert!(service.split(&ctx, id, items(&["70", "30"])).await.is_err());

        let amounts: Vec<f64> = gw
            .rows("expense_splits")
            .iter()
            .filter_map(|row| row["amount"].as_f64())
            .collect();
        assert_eq!(amounts, vec![50.0, 50.0]);
    }

    #[tokio::test]
    async fn list_applies_filters() {
        let (gw, service, ctx) = setup();
        let org = ctx.organization_id.unwrap();
        gw.seed(
            "expenses",
            vec![
                expense_row(Uuid::new_v4(), org, "draft", 1.0),
                expense_row(Uuid::new_v4(), org, "approved", 2.0),
                expense_row(Uuid::new_v4(), Uuid::new_v4(), "draft", 3.0),
            ],
        );

        let filter = ExpenseFilter { status: Some(ExpenseStatus::Draft), ..Default::default() };
        let drafts = service.list(&ctx, filter).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].status, ExpenseStatus::Draft);
    }
}
