// src/models/reports.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{
    expenses::Expense,
    status::{DisplayStatus, StatusColor},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Paid,
}

impl DisplayStatus for ReportStatus {
    const ALL: &'static [Self] = &[
        ReportStatus::Draft,
        ReportStatus::Submitted,
        ReportStatus::Approved,
        ReportStatus::Rejected,
        ReportStatus::Paid,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Submitted => "submitted",
            ReportStatus::Approved => "approved",
            ReportStatus::Rejected => "rejected",
            ReportStatus::Paid => "paid",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "Draft",
            ReportStatus::Submitted => "Submitted",
            ReportStatus::Approved => "Approved",
            ReportStatus::Rejected => "Rejected",
            ReportStatus::Paid => "Paid",
        }
    }

    fn color(&self) -> StatusColor {
        match self {
            ReportStatus::Draft => StatusColor::Gray,
            ReportStatus::Submitted => StatusColor::Yellow,
            ReportStatus::Approved => StatusColor::Green,
            ReportStatus::Rejected => StatusColor::Red,
            ReportStatus::Paid => StatusColor::Emerald,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExpenseReport {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    pub user_id: Uuid,

    #[schema(example = "Viagem São Paulo - Março")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,

    pub status: ReportStatus,

    #[schema(example = "1250.00")]
    #[serde(default)]
    pub total_amount: Decimal,
    #[schema(example = "USD")]
    pub currency: String,

    #[serde(default)]
    pub period_start: Option<NaiveDate>,
    #[serde(default)]
    pub period_end: Option<NaiveDate>,

    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ExpenseReport {
    pub fn is_draft(&self) -> bool {
        self.status == ReportStatus::Draft
    }
}

/// Relatório com as despesas que ele agrupa.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportWithExpenses {
    #[serde(flatten)]
    pub report: ExpenseReport,
    pub expenses: Vec<Expense>,
}
