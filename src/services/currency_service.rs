// src/services/currency_service.rs

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::{
    common::{
        context::RequestContext,
        error::{AppError, GatewayResultExt},
    },
    gateway::{decode, decode_rows, Direction, Gateway, Scope, TableQuery},
    models::currency::{Conversion, Currency, ExchangeRate},
};

const COMPONENT: &str = "CurrencyService";

fn normalize(code: &str) -> Result<String, AppError> {
    let code = code.trim().to_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::InvalidInput(format!("Invalid currency code: {}", code)));
    }
    Ok(code)
}

/// Cotações são globais: só exigem usuário autenticado.
#[derive(Clone)]
pub struct CurrencyService {
    gateway: Arc<dyn Gateway>,
}

impl CurrencyService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    fn scope(&self, ctx: &RequestContext) -> Result<Scope, AppError> {
        let user_id = ctx.require_user()?;
        Ok(Scope { user_id, organization_id: ctx.organization_id })
    }

    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<Currency>, AppError> {
        let scope = self.scope(ctx)?;
        let query = TableQuery::new("currencies").order("code", Direction::Asc);
        let rows = self.gateway.select(&scope, query).await.logged(COMPONENT, "list")?;
        decode_rows(rows).logged(COMPONENT, "list")
    }

    pub async fn rate(
        &self,
        ctx: &RequestContext,
        base: &str,
        target: &str,
        date: Option<NaiveDate>,
    ) -> Result<ExchangeRate, AppError> {
        let scope = self.scope(ctx)?;
        let (base, target) = (normalize(base)?, normalize(target)?);
        let day = date.unwrap_or_else(|| chrono::Utc::now().date_naive());

        if base == target {
            return Ok(ExchangeRate {
                id: None,
                base_currency: base,
                target_currency: target,
                rate: Decimal::ONE,
                effective_date: day,
            });
        }

        let args = json!({ "p_base": base, "p_target": target, "p_date": date });
        let payload = self
            .gateway
            .rpc(&scope, "get_exchange_rate", args)
            .await
            .logged(COMPONENT, "rate")?;

        // A procedure devolve só o número ou a linha inteira, conforme a versão
        match payload {
            Value::Object(_) => decode(payload).logged(COMPONENT, "rate"),
            Value::Null => Err(AppError::NotFound("Exchange rate")),
            scalar => Ok(ExchangeRate {
                id: None,
                base_currency: base,
                target_currency: target,
                rate: decode(scalar).logged(COMPONENT, "rate")?,
                effective_date: day,
            }),
        }
    }

    pub async fn convert(
        &self,
        ctx: &RequestContext,
        amount: Decimal,
        from: &str,
        to: &str,
        date: Option<NaiveDate>,
    ) -> Result<Conversion, AppError> {
        let scope = self.scope(ctx)?;
        let (from, to) = (normalize(from)?, normalize(to)?);

        if from == to {
            return Ok(Conversion { amount, rate: Decimal::ONE });
        }

        let args = json!({ "p_amount": amount, "p_from": from, "p_to": to, "p_date": date });
        let payload = self
            .gateway
            .rpc(&scope, "convert_currency", args)
            .await
            .logged(COMPONENT, "convert")?;
        decode(payload).logged(COMPONENT, "convert")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryGateway;
    use uuid::Uuid;

    #[tokio::test]
    async fn same_currency_needs_no_round_trip() {
        let gw = Arc::new(MemoryGateway::new());
        let service = CurrencyService::new(gw.clone());
        let ctx = RequestContext::new(Some(Uuid::new_v4()), None);

        let conversion = service.convert(&ctx, Decimal::from(10), "usd", "USD", None).await.unwrap();
        assert_eq!(conversion.amount, Decimal::from(10));
        assert_eq!(conversion.rate, Decimal::ONE);
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn scalar_rate_is_wrapped() {
        let gw = Arc::new(MemoryGateway::new());
        gw.on_rpc("get_exchange_rate", |args| {
            assert_eq!(args["p_base"], "USD");
            assert_eq!(args["p_target"], "BRL");
            Ok(json!(5.25))
        });
        let service = CurrencyService::new(gw);
        let ctx = RequestContext::new(Some(Uuid::new_v4()), None);

        let rate = service.rate(&ctx, "usd", "brl", None).await.unwrap();
        assert_eq!(rate.rate, "5.25".parse::<Decimal>().unwrap());
        assert_eq!(rate.base_currency, "USD");
    }

    #[tokio::test]
    async fn bad_codes_fail_locally() {
        let gw = Arc::new(MemoryGateway::new());
        let service = CurrencyService::new(gw.clone());
        let ctx = RequestContext::new(Some(Uuid::new_v4()), None);

        assert!(matches!(
            service.rate(&ctx, "US", "BRL", None).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            service.list(&RequestContext::default()).await,
            Err(AppError::NotAuthenticated)
        ));
        assert!(gw.calls().is_empty());
    }
}
