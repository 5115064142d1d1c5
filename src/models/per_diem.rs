// src/models/per_diem.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PerDiemRate {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[schema(example = "New York City")]
    pub location: String,
    #[schema(example = "US")]
    #[serde(default)]
    pub country_code: Option<String>,
    #[schema(example = "282.00")]
    pub lodging_rate: Decimal,
    /// Meals & Incidental Expenses (diária cheia)
    #[schema(example = "79.00")]
    pub mie_rate: Decimal,
    pub effective_from: NaiveDate,
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
}

/// Refeições já fornecidas num dia (abatem da diária) + dia de ida/volta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MealFlags {
    #[serde(default)]
    pub breakfast: bool,
    #[serde(default)]
    pub lunch: bool,
    #[serde(default)]
    pub dinner: bool,
    #[serde(default)]
    pub is_first_or_last_day: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DayAllowance {
    #[schema(example = 1)]
    pub day: u32,
    pub meals: MealFlags,
    #[schema(example = "59.25")]
    pub mie: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TripAllowance {
    pub location: String,
    pub mie_rate: Decimal,
    pub lodging_rate: Decimal,
    pub days: Vec<DayAllowance>,
    #[schema(example = "434.50")]
    pub total_mie: Decimal,
}
