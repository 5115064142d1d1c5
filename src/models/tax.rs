// src/models/tax.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::expenses::default_true;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaxRate {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    #[schema(example = "ICMS SP")]
    pub name: String,
    #[schema(example = "BR-SP")]
    pub region: String,
    #[schema(example = "0.18")]
    pub rate: Decimal,
    #[schema(example = "sales")]
    pub tax_type: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaxCalculation {
    #[schema(example = "18.00")]
    pub tax_amount: Decimal,
    #[schema(example = "0.18")]
    pub rate: Decimal,
    #[schema(example = "82.00")]
    pub net_amount: Decimal,
}
