// src/services/policy_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        context::RequestContext,
        error::{AppError, GatewayResultExt},
    },
    gateway::{decode, decode_rows, Direction, Filter, Gateway, TableQuery},
    models::policies::{
        ExpensePolicy, PolicyEvaluation, PolicyRuleType, PolicySeverity, PolicyViolation,
    },
};

const COMPONENT: &str = "PolicyService";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PolicyInput {
    #[validate(length(min = 1, max = 120, message = "O nome é obrigatório."))]
    #[schema(example = "Limite de refeição")]
    pub name: String,
    pub rule_type: PolicyRuleType,
    pub category_id: Option<Uuid>,
    #[schema(example = "75.00")]
    pub max_amount: Option<Decimal>,
    pub requires_receipt_over: Option<Decimal>,
    #[validate(range(min = 1, message = "O prazo precisa ser de pelo menos 1 dia."))]
    pub max_days_old: Option<i32>,
    pub severity: PolicySeverity,
    #[serde(default = "crate::models::expenses::default_true")]
    pub is_active: bool,
}

impl PolicyInput {
    /// Cada tipo de regra precisa do parâmetro que ela avalia.
    fn check_rule(&self) -> Result<(), AppError> {
        let missing = match self.rule_type {
            PolicyRuleType::AmountLimit if self.max_amount.is_none() => Some("max_amount"),
            PolicyRuleType::ReceiptRequired if self.requires_receipt_over.is_none() => {
                Some("requires_receipt_over")
            }
            PolicyRuleType::CategoryRestriction if self.category_id.is_none() => {
                Some("category_id")
            }
            PolicyRuleType::TimeLimit if self.max_days_old.is_none() => Some("max_days_old"),
            _ => None,
        };
        match missing {
            Some(field) => Err(AppError::InvalidInput(format!(
                "{} is required for this rule type",
                field
            ))),
            None => Ok(()),
        }
    }

    fn to_row(&self) -> Value {
        json!({
            "name": self.name,
            "rule_type": self.rule_type,
            "category_id": self.category_id,
            "max_amount": self.max_amount,
            "requires_receipt_over": self.requires_receipt_over,
            "max_days_old": self.max_days_old,
            "severity": self.severity,
            "is_active": self.is_active,
        })
    }
}

#[derive(Clone)]
pub struct PolicyService {
    gateway: Arc<dyn Gateway>,
}

impl PolicyService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<ExpensePolicy>, AppError> {
        let caller = ctx.require_caller()?;
        let query = TableQuery::new("expense_policies")
            .eq_id("organization_id", caller.organization_id)
            .order("name", Direction::Asc);
        let rows = self.gateway.select(&caller.scope(), query).await.logged(COMPONENT, "list")?;
        decode_rows(rows).logged(COMPONENT, "list")
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        input: PolicyInput,
    ) -> Result<ExpensePolicy, AppError> {
        let caller = ctx.require_caller()?;
        input.check_rule()?;

        let mut row = input.to_row();
        row["organization_id"] = json!(caller.organization_id);

        self.gateway
            .insert(&caller.scope(), "expense_policies", row)
            .await
            .and_then(decode)
            .logged(COMPONENT, "create")
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        policy_id: Uuid,
        input: PolicyInput,
    ) -> Result<ExpensePolicy, AppError> {
        let caller = ctx.require_caller()?;
        input.check_rule()?;

        let filters = vec![
            Filter::id("id", policy_id),
            Filter::id("organization_id", caller.organization_id),
        ];
        let mut rows = self
            .gateway
            .update(&caller.scope(), "expense_policies", filters, input.to_row())
            .await
            .logged(COMPONENT, "update")?;
        let row = rows.pop().ok_or(AppError::NotFound("Policy"))?;
        decode(row).logged(COMPONENT, "update")
    }

    pub async fn delete(&self, ctx: &RequestContext, policy_id: Uuid) -> Result<(), AppError> {
        let caller = ctx.require_caller()?;
        let filters = vec![
            Filter::id("id", policy_id),
            Filter::id("organization_id", caller.organization_id),
        ];
        let deleted = self
            .gateway
            .delete(&caller.scope(), "expense_policies", filters)
            .await
            .logged(COMPONENT, "delete")?;
        if deleted == 0 {
            return Err(AppError::NotFound("Policy"));
        }
        Ok(())
    }

    /// A regra em si roda no backend; aqui só reunimos o resultado.
    pub async fn evaluate(
        &self,
        ctx: &RequestContext,
        expense_id: Uuid,
    ) -> Result<PolicyEvaluation, AppError> {
        let caller = ctx.require_caller()?;
        let payload = self
            .gateway
            .rpc(&caller.scope(), "evaluate_expense_policies", json!({ "p_expense_id": expense_id }))
            .await
            .logged(COMPONENT, "evaluate")?;

        let violations: Vec<PolicyViolation> = if payload.is_null() {
            Vec::new()
        } else {
            decode(payload).logged(COMPONENT, "evaluate")?
        };
        if !violations.is_empty() {
            tracing::debug!("Despesa {} com {} violações de política", expense_id, violations.len());
        }
        Ok(PolicyEvaluation::new(expense_id, violations))
    }

    pub async fn violations(
        &self,
        ctx: &RequestContext,
        expense_id: Uuid,
    ) -> Result<Vec<PolicyViolation>, AppError> {
        let caller = ctx.require_caller()?;
        let query = TableQuery::new("policy_violations")
            .eq_id("expense_id", expense_id)
            .order("created_at", Direction::Desc);
        let rows = self
            .gateway
            .select(&caller.scope(), query)
            .await
            .logged(COMPONENT, "violations")?;
        decode_rows(rows).logged(COMPONENT, "violations")
    }
}
