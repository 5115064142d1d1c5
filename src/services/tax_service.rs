// src/services/tax_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::{
        context::RequestContext,
        error::{AppError, GatewayResultExt},
    },
    gateway::{decode, decode_rows, Direction, Gateway, TableQuery},
    models::tax::{TaxCalculation, TaxRate},
};

const COMPONENT: &str = "TaxService";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewTaxRate {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "ICMS SP")]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    #[schema(example = "BR-SP")]
    pub region: String,
    /// Fração (0.18 = 18%)
    #[schema(example = "0.18")]
    pub rate: Decimal,
    #[validate(length(min = 1, max = 40))]
    #[schema(example = "sales")]
    pub tax_type: String,
}

#[derive(Clone)]
pub struct TaxService {
    gateway: Arc<dyn Gateway>,
}

impl TaxService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<TaxRate>, AppError> {
        let caller = ctx.require_caller()?;
        let query = TableQuery::new("tax_rates")
            .eq_id("organization_id", caller.organization_id)
            .order("region", Direction::Asc);
        let rows = self.gateway.select(&caller.scope(), query).await.logged(COMPONENT, "list")?;
        decode_rows(rows).logged(COMPONENT, "list")
    }

    pub async fn create(&self, ctx: &RequestContext, input: NewTaxRate) -> Result<TaxRate, AppError> {
        let caller = ctx.require_caller()?;
        if input.rate < Decimal::ZERO || input.rate > Decimal::ONE {
            return Err(AppError::InvalidInput("Tax rate must be a fraction between 0 and 1".into()));
        }

        let row = json!({
            "organization_id": caller.organization_id,
            "name": input.name,
            "region": input.region,
            "rate": input.rate,
            "tax_type": input.tax_type,
            "is_active": true,
        });
        self.gateway
            .insert(&caller.scope(), "tax_rates", row)
            .await
            .and_then(decode)
            .logged(COMPONENT, "create")
    }

    pub async fn calculate(
        &self,
        ctx: &RequestContext,
        amount: Decimal,
        region: &str,
        tax_type: Option<&str>,
    ) -> Result<TaxCalculation, AppError> {
        let caller = ctx.require_caller()?;

        let args = json!({
            "p_organization_id": caller.organization_id,
            "p_amount": amount,
            "p_region": region,
            "p_tax_type": tax_type,
        });
        let payload = self
            .gateway
            .rpc(&caller.scope(), "calculate_tax", args)
            .await
            .logged(COMPONENT, "calculate")?;
        decode(payload).logged(COMPONENT, "calculate")
    }
}
