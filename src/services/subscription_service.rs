// src/services/subscription_service.rs

use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    common::{
        context::RequestContext,
        error::{AppError, GatewayResultExt},
    },
    gateway::{decode, decode_rows, Direction, Filter, Gateway, GatewayError, Scope, TableQuery},
    models::subscriptions::{PlanLimit, PlanLimitCheck, Subscription, SubscriptionPlan},
};

const COMPONENT: &str = "SubscriptionService";

#[derive(Clone)]
pub struct SubscriptionService {
    gateway: Arc<dyn Gateway>,
}

impl SubscriptionService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Catálogo público de planos; não depende de organização.
    pub async fn list_plans(&self, ctx: &RequestContext) -> Result<Vec<SubscriptionPlan>, AppError> {
        let user_id = ctx.require_user()?;
        let query = TableQuery::new("subscription_plans")
            .eq("is_active", true)
            .order("price_monthly", Direction::Asc);
        let rows = self
            .gateway
            .select(&Scope::user(user_id), query)
            .await
            .logged(COMPONENT, "list_plans")?;
        decode_rows(rows).logged(COMPONENT, "list_plans")
    }

    /// `None` quando a organização ainda não tem assinatura.
    pub async fn current(&self, ctx: &RequestContext) -> Result<Option<Subscription>, AppError> {
        let caller = ctx.require_caller()?;
        let query = TableQuery::new("subscriptions").eq_id("organization_id", caller.organization_id);

        match self.gateway.select_one(&caller.scope(), query).await {
            Ok(row) => decode(row).map(Some).logged(COMPONENT, "current"),
            Err(GatewayError::RowNotVisible) => Ok(None),
            Err(e) => Err(e).logged(COMPONENT, "current"),
        }
    }

    pub async fn change_plan(
        &self,
        ctx: &RequestContext,
        plan_id: Uuid,
    ) -> Result<Subscription, AppError> {
        let caller = ctx.require_caller()?;
        let args = json!({
            "p_organization_id": caller.organization_id,
            "p_plan_id": plan_id,
        });
        let payload = self
            .gateway
            .rpc(&caller.scope(), "change_subscription_plan", args)
            .await
            .logged(COMPONENT, "change_plan")?;
        let subscription: Subscription = decode(payload).logged(COMPONENT, "change_plan")?;

        tracing::info!(
            "Organização {} trocou para o plano {}",
            caller.organization_id,
            subscription.plan_id
        );
        Ok(subscription)
    }

    pub async fn cancel_at_period_end(&self, ctx: &RequestContext) -> Result<Subscription, AppError> {
        let caller = ctx.require_caller()?;
        let filters = vec![Filter::id("organization_id", caller.organization_id)];
        let mut rows = self
            .gateway
            .update(&caller.scope(), "subscriptions", filters, json!({ "cancel_at_period_end": true }))
            .await
            .logged(COMPONENT, "cancel_at_period_end")?;
        let row = rows.pop().ok_or(AppError::NotFound("Subscription"))?;
        decode(row).logged(COMPONENT, "cancel_at_period_end")
    }

    pub async fn check_limit(
        &self,
        ctx: &RequestContext,
        limit: PlanLimit,
    ) -> Result<PlanLimitCheck, AppError> {
        let caller = ctx.require_caller()?;
        let args = json!({
            "p_organization_id": caller.organization_id,
            "p_limit": limit.as_str(),
        });
        let payload = self
            .gateway
            .rpc(&caller.scope(), "check_plan_limit", args)
            .await
            .logged(COMPONENT, "check_limit")?;

        // Algumas versões da procedure devolvem só o booleano
        match payload {
            Value::Bool(allowed) => Ok(PlanLimitCheck { allowed, used: 0, limit: None }),
            Value::Array(mut rows) if !rows.is_empty() => {
                decode(rows.swap_remove(0)).logged(COMPONENT, "check_limit")
            }
            other => decode(other).logged(COMPONENT, "check_limit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gateway::memory::MemoryGateway, models::subscriptions::SubscriptionStatus};

    fn subscription_row(org: Uuid) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "organization_id": org,
            "plan_id": Uuid::new_v4(),
            "status": "active",
            "cancel_at_period_end": false
        })
    }

    #[tokio::test]
    async fn plans_only_need_a_user() {
        let gw = Arc::new(MemoryGateway::new());
        gw.seed(
            "subscription_plans",
            vec![
                json!({ "id": Uuid::new_v4(), "name": "Business", "price_monthly": 49.0, "is_active": true }),
                json!({ "id": Uuid::new_v4(), "name": "Free", "price_monthly": 0.0, "is_active": true }),
                json!({ "id": Uuid::new_v4(), "name": "Legacy", "price_monthly": 9.0, "is_active": false }),
            ],
        );
        let service = SubscriptionService::new(gw);
        let ctx = RequestContext::new(Some(Uuid::new_v4()), None);

        let plans = service.list_plans(&ctx).await.unwrap();
        let names: Vec<_> = plans.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Free", "Business"]);
    }

    #[tokio::test]
    async fn missing_subscription_is_none() {
        let gw = Arc::new(MemoryGateway::new());
        let service = SubscriptionService::new(gw.clone());
        let org = Uuid::new_v4();
        let ctx = RequestContext::new(Some(Uuid::new_v4()), Some(org));

        assert!(service.current(&ctx).await.unwrap().is_none());

        gw.seed("subscriptions", vec![subscription_row(org)]);
        let current = service.current(&ctx).await.unwrap().unwrap();
        assert_eq!(current.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn cancel_flags_the_period_end() {
        let gw = Arc::new(MemoryGateway::new());
        let org = Uuid::new_v4();
        gw.seed("subscriptions", vec![subscription_row(org)]);
        let service = SubscriptionService::new(gw.clone());
        let ctx = RequestContext::new(Some(Uuid::new_v4()), Some(org));

        let cancelled = service.cancel_at_period_end(&ctx).await.unwrap();
        assert!(cancelled.cancel_at_period_end);

        let other = RequestContext::new(Some(Uuid::new_v4()), Some(Uuid::new_v4()));
        assert!(matches!(
            service.cancel_at_period_end(&other).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn check_limit_sends_the_limit_name() {
        let gw = Arc::new(MemoryGateway::new());
        gw.on_rpc("check_plan_limit", |args| {
            assert_eq!(args["p_limit"], "expenses_per_month");
            Ok(json!({ "allowed": false, "used": 100, "limit": 100 }))
        });
        let service = SubscriptionService::new(gw.clone());
        let ctx = RequestContext::new(Some(Uuid::new_v4()), Some(Uuid::new_v4()));

        let check = service.check_limit(&ctx, PlanLimit::ExpensesPerMonth).await.unwrap();
        assert!(!check.allowed);
        assert_eq!(check.limit, Some(100));
    }

    #[tokio::test]
    async fn bare_boolean_limit_is_accepted() {
        let gw = Arc::new(MemoryGateway::new());
        gw.on_rpc("check_plan_limit", |_| Ok(json!(true)));
        let service = SubscriptionService::new(gw);
        let ctx = RequestContext::new(Some(Uuid::new_v4()), Some(Uuid::new_v4()));

        let check = service.check_limit(&ctx, PlanLimit::Users).await.unwrap();
        assert!(check.allowed);
        assert_eq!(check.limit, None);
    }
}
