// src/models/approvals.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    expenses::ExpenseStatus,
    reports::ReportStatus,
    status::{DisplayStatus, StatusColor},
};

// --- 1. Status da aprovação ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    AwaitingPayment,
    Rejected,
    Cancelled,
    Paid,
}

impl ApprovalStatus {
    /// Estados em que ainda existe alguém para decidir.
    pub fn is_actionable(&self) -> bool {
        matches!(self, ApprovalStatus::Pending | ApprovalStatus::AwaitingPayment)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApprovalStatus::Approved
                | ApprovalStatus::Paid
                | ApprovalStatus::Rejected
                | ApprovalStatus::Cancelled
        )
    }
}

impl DisplayStatus for ApprovalStatus {
    const ALL: &'static [Self] = &[
        ApprovalStatus::Pending,
        ApprovalStatus::Approved,
        ApprovalStatus::AwaitingPayment,
        ApprovalStatus::Rejected,
        ApprovalStatus::Cancelled,
        ApprovalStatus::Paid,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::AwaitingPayment => "awaiting_payment",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Cancelled => "cancelled",
            ApprovalStatus::Paid => "paid",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "Pending",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::AwaitingPayment => "Awaiting Payment",
            ApprovalStatus::Rejected => "Rejected",
            ApprovalStatus::Cancelled => "Cancelled",
            ApprovalStatus::Paid => "Paid",
        }
    }

    fn color(&self) -> StatusColor {
        match self {
            ApprovalStatus::Pending => StatusColor::Yellow,
            ApprovalStatus::Approved => StatusColor::Green,
            ApprovalStatus::AwaitingPayment => StatusColor::Blue,
            ApprovalStatus::Rejected => StatusColor::Red,
            ApprovalStatus::Cancelled => StatusColor::Gray,
            ApprovalStatus::Paid => StatusColor::Emerald,
        }
    }
}

// --- 2. O registro de aprovação (linha de `approvals`) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApprovalRecord {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    pub organization_id: Uuid,

    // Exatamente um dos dois vem preenchido
    pub expense_id: Option<Uuid>,
    pub report_id: Option<Uuid>,

    pub workflow_id: Option<Uuid>,

    #[schema(example = 1)]
    pub current_step: i32,
    #[schema(example = 2)]
    pub total_steps: i32,

    pub current_approver_id: Option<Uuid>,
    #[serde(default)]
    pub submitted_by: Option<Uuid>,

    pub status: ApprovalStatus,

    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,

    pub submitted_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ApprovalRecord {
    /// O usuário é o aprovador da etapa atual e ainda há decisão a tomar.
    pub fn can_approve(&self, user_id: Uuid) -> bool {
        self.current_approver_id == Some(user_id) && self.status.is_actionable()
    }
}

// --- 3. Projeções usadas no join ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WorkflowSummary {
    pub id: Uuid,
    #[schema(example = "Aprovação padrão")]
    pub name: String,
    pub description: Option<String>,
}

impl WorkflowSummary {
    pub const COLUMNS: &'static [&'static str] = &["id", "name", "description"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExpenseSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "Uber")]
    pub merchant: String,
    pub description: Option<String>,
    #[schema(example = "42.90")]
    pub amount: Decimal,
    #[schema(example = "USD")]
    pub currency: String,
    pub expense_date: chrono::NaiveDate,
    pub status: ExpenseStatus,
}

impl ExpenseSummary {
    pub const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "merchant",
        "description",
        "amount",
        "currency",
        "expense_date",
        "status",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReportSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "Viagem São Paulo - Março")]
    pub title: String,
    pub total_amount: Decimal,
    pub currency: String,
    pub status: ReportStatus,
}

impl ReportSummary {
    pub const COLUMNS: &'static [&'static str] =
        &["id", "user_id", "title", "total_amount", "currency", "status"];
}

/// Registro + detalhes juntados em memória. Vive só durante a requisição.
/// Registros com o mesmo id estrangeiro compartilham o mesmo `Arc`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApprovalWithDetails {
    #[serde(flatten)]
    pub record: ApprovalRecord,
    #[schema(value_type = Option<WorkflowSummary>)]
    pub workflow: Option<Arc<WorkflowSummary>>,
    #[schema(value_type = Option<ExpenseSummary>)]
    pub expense: Option<Arc<ExpenseSummary>>,
    #[schema(value_type = Option<ReportSummary>)]
    pub report: Option<Arc<ReportSummary>>,
}

// --- 4. Resultado de aprovar/rejeitar ---

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApprovalDecision {
    pub approval_id: Uuid,
    pub status: ApprovalStatus,
    /// Ausente quando a linha deixou de ser visível logo após a transição.
    pub record: Option<ApprovalRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApprovalStats {
    #[serde(default)]
    pub pending_count: i64,
    #[serde(default)]
    pub approved_count: i64,
    #[serde(default)]
    pub rejected_count: i64,
    #[serde(default)]
    pub awaiting_payment_count: i64,
    #[schema(example = "18.5")]
    pub avg_approval_hours: Option<Decimal>,
}

// --- 5. Workflows ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApproverType {
    User,
    Role,
    Manager,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApprovalWorkflow {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApprovalWorkflowStep {
    pub id: Uuid,
    pub workflow_id: Uuid,
    #[schema(example = 1)]
    pub step_number: i32,
    pub approver_type: ApproverType,
    pub approver_user_id: Option<Uuid>,
    #[schema(example = "finance")]
    pub approver_role: Option<String>,
    #[schema(example = "500.00")]
    pub amount_threshold: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorkflowWithSteps {
    #[serde(flatten)]
    pub workflow: ApprovalWorkflow,
    pub steps: Vec<ApprovalWorkflowStep>,
}

// --- 6. Payloads de workflow ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewWorkflowStep {
    pub approver_type: ApproverType,
    pub approver_user_id: Option<Uuid>,
    #[validate(length(min = 1, message = "O papel do aprovador não pode ser vazio."))]
    pub approver_role: Option<String>,
    #[schema(example = "500.00")]
    pub amount_threshold: Option<Decimal>,
}

impl NewWorkflowStep {
    /// Cada tipo de aprovador exige o campo que o identifica.
    pub fn check_approver(&self) -> Result<(), String> {
        match self.approver_type {
            ApproverType::User if self.approver_user_id.is_none() => {
                Err("approver_user_id is required for user steps".to_string())
            }
            ApproverType::Role if self.approver_role.is_none() => {
                Err("approver_role is required for role steps".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewWorkflow {
    #[validate(length(min = 1, max = 120, message = "O nome é obrigatório."))]
    #[schema(example = "Despesas acima de 500")]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[validate(length(min = 1, message = "O workflow precisa de pelo menos uma etapa."))]
    #[validate(nested)]
    pub steps: Vec<NewWorkflowStep>,
}
