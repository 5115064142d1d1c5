// src/services/delegation_service.rs

use std::{sync::Arc, time::Duration};

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        context::{Caller, RequestContext},
        error::{AppError, GatewayResultExt},
        state_cell::KeyedCache,
    },
    gateway::{decode, decode_rows, Direction, Filter, Gateway, TableQuery},
    models::delegation::Delegation,
};

const COMPONENT: &str = "DelegationService";
const RECEIVED_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewDelegation {
    pub delegate_id: Uuid,
    #[serde(default)]
    pub can_submit: bool,
    #[serde(default)]
    pub can_approve: bool,
    pub starts_on: NaiveDate,
    pub ends_on: Option<NaiveDate>,
}

/// Delegações recebidas, por (organização, usuário delegado).
type ReceivedCache = KeyedCache<(Uuid, Uuid), Vec<Delegation>>;

#[derive(Clone)]
pub struct DelegationService {
    gateway: Arc<dyn Gateway>,
    received: Arc<ReceivedCache>,
}

impl DelegationService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway, received: Arc::new(KeyedCache::new(RECEIVED_TTL)) }
    }

    /// Delegações que eu concedi.
    pub async fn granted(&self, ctx: &RequestContext) -> Result<Vec<Delegation>, AppError> {
        let caller = ctx.require_caller()?;
        self.load(&caller, "delegator_id", "granted").await
    }

    /// Delegações que recebi e que valem hoje. A lista bruta fica em cache por usuário.
    pub async fn received(&self, ctx: &RequestContext) -> Result<Vec<Delegation>, AppError> {
        self.received_on(ctx, Utc::now().date_naive()).await
    }

    pub(crate) async fn received_on(
        &self,
        ctx: &RequestContext,
        today: NaiveDate,
    ) -> Result<Vec<Delegation>, AppError> {
        let caller = ctx.require_caller()?;
        let key = (caller.organization_id, caller.user_id);

        let delegations = match self.received.get(&key) {
            Some(cached) => cached,
            None => {
                let ticket = self.received.ticket();
                let loaded = self.load(&caller, "delegate_id", "received").await?;
                self.received.put(key, loaded.clone(), ticket);
                loaded
            }
        };

        Ok(delegations.into_iter().filter(|d| d.is_effective_on(today)).collect())
    }

    async fn load(
        &self,
        caller: &Caller,
        column: &'static str,
        operation: &'static str,
    ) -> Result<Vec<Delegation>, AppError> {
        let query = TableQuery::new("delegations")
            .eq_id("organization_id", caller.organization_id)
            .eq_id(column, caller.user_id)
            .eq("is_active", true)
            .order("starts_on", Direction::Desc);
        let rows = self.gateway.select(&caller.scope(), query).await.logged(COMPONENT, operation)?;
        decode_rows(rows).logged(COMPONENT, operation)
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        input: NewDelegation,
    ) -> Result<Delegation, AppError> {
        let caller = ctx.require_caller()?;
        if input.delegate_id == caller.user_id {
            return Err(AppError::InvalidInput("You cannot delegate to yourself".into()));
        }
        if input.ends_on.is_some_and(|end| end <= input.starts_on) {
            return Err(AppError::InvalidInput("The end date must be after the start date".into()));
        }
        if !input.can_submit && !input.can_approve {
            return Err(AppError::InvalidInput("A delegation must grant at least one permission".into()));
        }

        let row = json!({
            "organization_id": caller.organization_id,
            "delegator_id": caller.user_id,
            "delegate_id": input.delegate_id,
            "can_submit": input.can_submit,
            "can_approve": input.can_approve,
            "starts_on": input.starts_on,
            "ends_on": input.ends_on,
            "is_active": true,
        });
        let delegation: Delegation = self
            .gateway
            .insert(&caller.scope(), "delegations", row)
            .await
            .and_then(decode)
            .logged(COMPONENT, "create")?;

        self.forget(caller.organization_id, delegation.delegate_id);
        tracing::info!("Delegação {} -> {} criada", caller.user_id, delegation.delegate_id);
        Ok(delegation)
    }

    /// Só quem concedeu pode revogar.
    pub async fn revoke(
        &self,
        ctx: &RequestContext,
        delegation_id: Uuid,
    ) -> Result<Delegation, AppError> {
        let caller = ctx.require_caller()?;
        let filters = vec![
            Filter::id("id", delegation_id),
            Filter::id("organization_id", caller.organization_id),
            Filter::id("delegator_id", caller.user_id),
        ];
        let mut rows = self
            .gateway
            .update(&caller.scope(), "delegations", filters, json!({ "is_active": false }))
            .await
            .logged(COMPONENT, "revoke")?;
        let row = rows.pop().ok_or(AppError::NotFound("Delegation"))?;
        let delegation: Delegation = decode(row).logged(COMPONENT, "revoke")?;

        self.forget(caller.organization_id, delegation.delegate_id);
        Ok(delegation)
    }

    fn forget(&self, organization_id: Uuid, delegate_id: Uuid) {
        self.received.forget(&(organization_id, delegate_id));
    }

    /// Troca de sessão/organização: esvazia tudo.
    pub fn clear_cache(&self) {
        self.received.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryGateway;
    use serde_json::Value;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    fn delegation_row(org: Uuid, delegator: Uuid, delegate: Uuid) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "organization_id": org,
            "delegator_id": delegator,
            "delegate_id": delegate,
            "can_submit": true,
            "can_approve": true,
            "starts_on": "2026-04-01",
            "is_active": true
        })
    }

    #[tokio::test]
    async fn received_is_cached_until_a_change() {
        let gw = Arc::new(MemoryGateway::new());
        let service = DelegationService::new(gw.clone());
        let me = Uuid::new_v4();
        let org = Uuid::new_v4();
        let ctx = RequestContext::new(Some(me), Some(org));
        gw.seed("delegations", vec![delegation_row(org, Uuid::new_v4(), me)]);

        assert_eq!(service.received_on(&ctx, day(5)).await.unwrap().len(), 1);
        assert_eq!(service.received_on(&ctx, day(5)).await.unwrap().len(), 1);
        assert_eq!(gw.selects_on("delegations").len(), 1);

        // Alguém me concede outra delegação
        let boss = Uuid::new_v4();
        let boss_ctx = RequestContext::new(Some(boss), Some(org));
        let input = NewDelegation {
            delegate_id: me,
            can_submit: true,
            can_approve: false,
            starts_on: day(1),
            ends_on: Some(day(10)),
        };
        service.create(&boss_ctx, input).await.unwrap();

        assert_eq!(service.received_on(&ctx, day(5)).await.unwrap().len(), 2);
        assert_eq!(gw.selects_on("delegations").len(), 2);
    }

    #[tokio::test]
    async fn received_skips_delegations_outside_their_period() {
        let gw = Arc::new(MemoryGateway::new());
        let service = DelegationService::new(gw.clone());
        let (me, org) = (Uuid::new_v4(), Uuid::new_v4());
        let ctx = RequestContext::new(Some(me), Some(org));

        let mut expired = delegation_row(org, Uuid::new_v4(), me);
        expired["ends_on"] = json!("2026-04-10");
        let mut upcoming = delegation_row(org, Uuid::new_v4(), me);
        upcoming["starts_on"] = json!("2026-04-20");
        gw.seed("delegations", vec![expired, upcoming]);

        assert!(service.received_on(&ctx, day(15)).await.unwrap().is_empty());
        // Mesmo vindo do cache, a data é conferida de novo
        assert_eq!(service.received_on(&ctx, day(5)).await.unwrap().len(), 1);
        assert_eq!(service.received_on(&ctx, day(25)).await.unwrap().len(), 1);
        assert_eq!(gw.selects_on("delegations").len(), 1);
    }

    #[tokio::test]
    async fn invalid_delegations_fail_locally() {
        let gw = Arc::new(MemoryGateway::new());
        let service = DelegationService::new(gw.clone());
        let me = Uuid::new_v4();
        let ctx = RequestContext::new(Some(me), Some(Uuid::new_v4()));

        let to_self = NewDelegation {
            delegate_id: me,
            can_submit: true,
            can_approve: true,
            starts_on: day(1),
            ends_on: None,
        };
        assert!(matches!(service.create(&ctx, to_self).await, Err(AppError::InvalidInput(_))));

        let backwards = NewDelegation {
            delegate_id: Uuid::new_v4(),
            can_submit: true,
            can_approve: true,
            starts_on: day(10),
            ends_on: Some(day(10)),
        };
        assert!(matches!(service.create(&ctx, backwards).await, Err(AppError::InvalidInput(_))));

        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn only_the_delegator_can_revoke() {
        let gw = Arc::new(MemoryGateway::new());
        let service = DelegationService::new(gw.clone());
        let org = Uuid::new_v4();
        let delegator = Uuid::new_v4();
        let row = delegation_row(org, delegator, Uuid::new_v4());
        let id: Uuid = serde_json::from_value(row["id"].clone()).unwrap();
        gw.seed("delegations", vec![row]);

        let stranger = RequestContext::new(Some(Uuid::new_v4()), Some(org));
        assert!(matches!(service.revoke(&stranger, id).await, Err(AppError::NotFound(_))));

        let owner = RequestContext::new(Some(delegator), Some(org));
        let revoked = service.revoke(&owner, id).await.unwrap();
        assert!(!revoked.is_active);
    }
}
