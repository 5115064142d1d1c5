// src/models/currency.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Currency {
    #[schema(example = "BRL")]
    pub code: String,
    #[schema(example = "Real brasileiro")]
    pub name: String,
    #[schema(example = "R$")]
    #[serde(default)]
    pub symbol: Option<String>,
    #[schema(example = 2)]
    #[serde(default = "default_places")]
    pub decimal_places: i32,
}

fn default_places() -> i32 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExchangeRate {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[schema(example = "USD")]
    pub base_currency: String,
    #[schema(example = "BRL")]
    pub target_currency: String,
    #[schema(example = "5.4321")]
    pub rate: Decimal,
    pub effective_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Conversion {
    #[schema(example = "543.21")]
    pub amount: Decimal,
    #[schema(example = "5.4321")]
    pub rate: Decimal,
}
