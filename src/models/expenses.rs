// src/models/expenses.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::status::{DisplayStatus, StatusColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Reimbursed,
}

impl DisplayStatus for ExpenseStatus {
    const ALL: &'static [Self] = &[
        ExpenseStatus::Draft,
        ExpenseStatus::Submitted,
        ExpenseStatus::Approved,
        ExpenseStatus::Rejected,
        ExpenseStatus::Reimbursed,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Draft => "draft",
            ExpenseStatus::Submitted => "submitted",
            ExpenseStatus::Approved => "approved",
            ExpenseStatus::Rejected => "rejected",
            ExpenseStatus::Reimbursed => "reimbursed",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ExpenseStatus::Draft => "Draft",
            ExpenseStatus::Submitted => "Submitted",
            ExpenseStatus::Approved => "Approved",
            ExpenseStatus::Rejected => "Rejected",
            ExpenseStatus::Reimbursed => "Reimbursed",
        }
    }

    fn color(&self) -> StatusColor {
        match self {
            ExpenseStatus::Draft => StatusColor::Gray,
            ExpenseStatus::Submitted => StatusColor::Yellow,
            ExpenseStatus::Approved => StatusColor::Green,
            ExpenseStatus::Rejected => StatusColor::Red,
            ExpenseStatus::Reimbursed => StatusColor::Emerald,
        }
    }
}

// --- Despesa ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Expense {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(ignore)]
    pub organization_id: Uuid,

    pub user_id: Uuid,
    #[serde(default)]
    pub report_id: Option<Uuid>,
    #[serde(default)]
    pub vendor_id: Option<Uuid>,
    #[serde(default)]
    pub category_id: Option<Uuid>,

    #[schema(example = "Uber")]
    pub merchant: String,
    #[serde(default)]
    pub description: Option<String>,

    #[schema(example = "42.90")]
    pub amount: Decimal,
    #[schema(example = "USD")]
    pub currency: String,

    pub expense_date: NaiveDate,
    pub status: ExpenseStatus,

    #[serde(default)]
    pub receipt_id: Option<Uuid>,
    #[serde(default)]
    pub is_billable: bool,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Expense {
    pub fn is_draft(&self) -> bool {
        self.status == ExpenseStatus::Draft
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExpenseCategory {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    #[schema(example = "Viagens")]
    pub name: String,
    #[schema(example = "6100")]
    #[serde(default)]
    pub gl_code: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExpenseSplit {
    pub id: Uuid,
    pub expense_id: Uuid,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[schema(example = "33.34")]
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

/// Item de rateio antes de ser gravado.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SplitItem {
    pub category_id: Option<Uuid>,
    #[schema(example = "33.33")]
    pub amount: Decimal,
    pub description: Option<String>,
}

/// Uma possível duplicata apontada pelo backend.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DuplicateCandidate {
    pub expense_id: Uuid,
    #[schema(example = "0.92")]
    pub score: Decimal,
    #[schema(example = "Same merchant and amount within 2 days")]
    #[serde(default)]
    pub reason: Option<String>,
}

// Filtros da listagem
#[derive(Debug, Clone, Default, Deserialize, ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpenseFilter {
    pub status: Option<ExpenseStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    pub report_id: Option<Uuid>,
}

pub(crate) fn default_true() -> bool {
    true
}
