// src/models/policies.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::expenses::default_true;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PolicyRuleType {
    AmountLimit,
    ReceiptRequired,
    CategoryRestriction,
    TimeLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PolicySeverity {
    Warning, // só avisa
    Block,   // impede a submissão
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExpensePolicy {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,

    #[schema(example = "Limite de refeição")]
    pub name: String,
    pub rule_type: PolicyRuleType,

    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[schema(example = "75.00")]
    #[serde(default)]
    pub max_amount: Option<Decimal>,
    #[schema(example = "25.00")]
    #[serde(default)]
    pub requires_receipt_over: Option<Decimal>,
    #[schema(example = 60)]
    #[serde(default)]
    pub max_days_old: Option<i32>,

    pub severity: PolicySeverity,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PolicyViolation {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub expense_id: Uuid,
    pub policy_id: Uuid,
    #[schema(example = "Amount exceeds the 75.00 meal limit")]
    pub message: String,
    pub severity: PolicySeverity,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Resultado da avaliação das políticas para uma despesa.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PolicyEvaluation {
    pub expense_id: Uuid,
    pub violations: Vec<PolicyViolation>,
    /// Alguma violação do tipo `block`.
    pub blocked: bool,
}

impl PolicyEvaluation {
    pub fn new(expense_id: Uuid, violations: Vec<PolicyViolation>) -> Self {
        let blocked = violations.iter().any(|v| v.severity == PolicySeverity::Block);
        Self { expense_id, violations, blocked }
    }
}
