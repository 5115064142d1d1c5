// src/services/organization_service.rs

use std::{sync::Arc, time::Duration};

use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        context::RequestContext,
        error::{AppError, GatewayResultExt},
        state_cell::KeyedCache,
    },
    gateway::{decode, decode_rows, Direction, Filter, Gateway, Scope, TableQuery},
    models::organizations::{MemberRole, Membership, Organization, OrganizationMember},
};

const COMPONENT: &str = "OrganizationService";
const MEMBERSHIPS_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewOrganization {
    #[validate(length(min = 2, max = 120, message = "O nome precisa ter entre 2 e 120 caracteres."))]
    #[schema(example = "Acme Ltda")]
    pub name: String,
    #[validate(length(min = 2, max = 60))]
    #[schema(example = "acme")]
    pub slug: Option<String>,
    #[validate(length(equal = 3, message = "Use o código ISO da moeda (ex: USD)."))]
    #[schema(example = "BRL")]
    pub base_currency: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewMember {
    pub user_id: Uuid,
    pub role: MemberRole,
}

/// `Acme Ltda.` -> `acme-ltda`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[derive(Clone)]
pub struct OrganizationService {
    gateway: Arc<dyn Gateway>,
    memberships: Arc<KeyedCache<Uuid, Vec<Membership>>>,
}

impl OrganizationService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway, memberships: Arc::new(KeyedCache::new(MEMBERSHIPS_TTL)) }
    }

    /// Organizações do usuário (cache curto por usuário).
    pub async fn my_memberships(&self, ctx: &RequestContext) -> Result<Vec<Membership>, AppError> {
        let user_id = ctx.require_user()?;

        if let Some(cached) = self.memberships.get(&user_id) {
            return Ok(cached);
        }

        let ticket = self.memberships.ticket();
        let query = TableQuery::new("organization_members")
            .columns(&["organization_id", "role"])
            .eq_id("user_id", user_id)
            .order("joined_at", Direction::Asc);
        let rows = self
            .gateway
            .select(&Scope::user(user_id), query)
            .await
            .logged(COMPONENT, "my_memberships")?;
        let memberships: Vec<Membership> = decode_rows(rows).logged(COMPONENT, "my_memberships")?;

        self.memberships.put(user_id, memberships.clone(), ticket);
        Ok(memberships)
    }

    /// Vínculo atual do usuário com a organização, sempre lido do backend.
    /// Usado pelo guard HTTP e pelas checagens de papel.
    pub async fn membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Membership>, AppError> {
        let query = TableQuery::new("organization_members")
            .columns(&["organization_id", "role"])
            .eq_id("user_id", user_id)
            .eq_id("organization_id", organization_id);
        let rows = self
            .gateway
            .select(&Scope::user(user_id), query.limit(1))
            .await
            .logged(COMPONENT, "membership")?;
        let mut memberships: Vec<Membership> = decode_rows(rows).logged(COMPONENT, "membership")?;
        Ok(memberships.pop())
    }

    pub async fn my_organizations(&self, ctx: &RequestContext) -> Result<Vec<Organization>, AppError> {
        let user_id = ctx.require_user()?;
        let ids: Vec<Uuid> = self
            .my_memberships(ctx)
            .await?
            .into_iter()
            .map(|m| m.organization_id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = TableQuery::new("organizations").in_ids("id", ids).order("name", Direction::Asc);
        let rows = self
            .gateway
            .select(&Scope::user(user_id), query)
            .await
            .logged(COMPONENT, "my_organizations")?;
        decode_rows(rows).logged(COMPONENT, "my_organizations")
    }

    /// Cria a organização e o vínculo de dono numa só procedure.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        input: NewOrganization,
    ) -> Result<Organization, AppError> {
        let user_id = ctx.require_user()?;
        let slug = input.slug.as_deref().map(slugify).unwrap_or_else(|| slugify(&input.name));
        if slug.is_empty() {
            return Err(AppError::InvalidInput("Organization name must contain letters or digits".into()));
        }

        let args = json!({
            "p_name": input.name.trim(),
            "p_slug": slug,
            "p_base_currency": input.base_currency.to_uppercase(),
            "p_owner_id": user_id,
        });
        let payload = self
            .gateway
            .rpc(&Scope::user(user_id), "create_organization_with_owner", args)
            .await
            .logged(COMPONENT, "create")?;
        let organization: Organization = decode(payload).logged(COMPONENT, "create")?;

        self.forget(user_id);
        tracing::info!("Organização '{}' criada por {}", organization.name, user_id);
        Ok(organization)
    }

    pub async fn current(&self, ctx: &RequestContext) -> Result<Organization, AppError> {
        let caller = ctx.require_caller()?;
        let query = TableQuery::new("organizations").eq_id("id", caller.organization_id);
        self.gateway
            .select_one(&caller.scope(), query)
            .await
            .and_then(decode)
            .logged(COMPONENT, "current")
    }

    pub async fn members(&self, ctx: &RequestContext) -> Result<Vec<OrganizationMember>, AppError> {
        let caller = ctx.require_caller()?;
        let query = TableQuery::new("organization_members")
            .eq_id("organization_id", caller.organization_id)
            .order("joined_at", Direction::Asc);
        let rows = self.gateway.select(&caller.scope(), query).await.logged(COMPONENT, "members")?;
        decode_rows(rows).logged(COMPONENT, "members")
    }

    pub async fn add_member(
        &self,
        ctx: &RequestContext,
        input: NewMember,
    ) -> Result<OrganizationMember, AppError> {
        let caller = ctx.require_caller()?;
        self.require_manager(ctx).await?;
        if input.role == MemberRole::Owner {
            return Err(AppError::InvalidInput("Ownership cannot be granted here".into()));
        }

        let row = json!({
            "organization_id": caller.organization_id,
            "user_id": input.user_id,
            "role": input.role,
        });
        let member: OrganizationMember = self
            .gateway
            .insert(&caller.scope(), "organization_members", row)
            .await
            .and_then(decode)
            .logged(COMPONENT, "add_member")?;

        self.forget(input.user_id);
        Ok(member)
    }

    pub async fn remove_member(&self, ctx: &RequestContext, user_id: Uuid) -> Result<(), AppError> {
        let caller = ctx.require_caller()?;
        self.require_manager(ctx).await?;
        if user_id == caller.user_id {
            return Err(AppError::InvalidInput("You cannot remove yourself".into()));
        }

        let filters = vec![
            Filter::id("organization_id", caller.organization_id),
            Filter::id("user_id", user_id),
            Filter::In("role", vec![Value::from("admin"), Value::from("manager"), Value::from("member")]),
        ];
        let removed = self
            .gateway
            .delete(&caller.scope(), "organization_members", filters)
            .await
            .logged(COMPONENT, "remove_member")?;
        if removed == 0 {
            return Err(AppError::NotFound("Member"));
        }

        self.forget(user_id);
        Ok(())
    }

    async fn require_manager(&self, ctx: &RequestContext) -> Result<(), AppError> {
        let caller = ctx.require_caller()?;
        match self.membership(caller.user_id, caller.organization_id).await? {
            Some(m) if m.role.can_manage_members() => Ok(()),
            _ => Err(AppError::NotOrganizationMember),
        }
    }

    fn forget(&self, user_id: Uuid) {
        self.memberships.forget(&user_id);
    }

    pub fn clear_cache(&self) {
        self.memberships.clear();
    }
}
