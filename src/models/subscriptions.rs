// src/models/subscriptions.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::status::{DisplayStatus, StatusColor};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    #[schema(example = "Business")]
    pub name: String,
    #[schema(example = "49.00")]
    pub price_monthly: Decimal,
    #[serde(default)]
    pub max_users: Option<i32>,
    #[serde(default)]
    pub max_expenses_per_month: Option<i32>,
    #[serde(default)]
    pub features: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Cancelled,
}

impl DisplayStatus for SubscriptionStatus {
    const ALL: &'static [Self] = &[
        SubscriptionStatus::Trialing,
        SubscriptionStatus::Active,
        SubscriptionStatus::PastDue,
        SubscriptionStatus::Cancelled,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "Trial",
            SubscriptionStatus::Active => "Active",
            SubscriptionStatus::PastDue => "Past Due",
            SubscriptionStatus::Cancelled => "Cancelled",
        }
    }

    fn color(&self) -> StatusColor {
        match self {
            SubscriptionStatus::Trialing => StatusColor::Blue,
            SubscriptionStatus::Active => StatusColor::Green,
            SubscriptionStatus::PastDue => StatusColor::Yellow,
            SubscriptionStatus::Cancelled => StatusColor::Gray,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Subscription {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

/// Limites que o plano controla.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlanLimit {
    Users,
    ExpensesPerMonth,
}

impl PlanLimit {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanLimit::Users => "users",
            PlanLimit::ExpensesPerMonth => "expenses_per_month",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanLimitCheck {
    pub allowed: bool,
    #[schema(example = 3)]
    pub used: i64,
    /// `None` = ilimitado
    #[schema(example = 5)]
    #[serde(default)]
    pub limit: Option<i64>,
}
