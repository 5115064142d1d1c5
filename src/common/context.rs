// src/common/context.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    gateway::Scope,
    middleware::{auth::AuthenticatedUser, organization::OrganizationContext},
};

/// O que se sabe sobre quem está chamando. Qualquer um dos dois pode faltar;
/// quem decide se é obrigatório é o serviço, antes de qualquer chamada ao gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
}

/// Usuário autenticado + organização ativa, ambos garantidos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub organization_id: Uuid,
}

impl Caller {
    pub fn scope(&self) -> Scope {
        Scope::organization(self.user_id, self.organization_id)
    }
}

impl RequestContext {
    pub fn new(user_id: Option<Uuid>, organization_id: Option<Uuid>) -> Self {
        Self { user_id, organization_id }
    }

    pub fn require_user(&self) -> Result<Uuid, AppError> {
        self.user_id.ok_or(AppError::NotAuthenticated)
    }

    pub fn require_caller(&self) -> Result<Caller, AppError> {
        let user_id = self.require_user()?;
        let organization_id = self.organization_id.ok_or(AppError::NoOrganizationSelected)?;
        Ok(Caller { user_id, organization_id })
    }
}

// Extrator: junta o que os middlewares de sessão e de organização deixaram na requisição.
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts.extensions.get::<AuthenticatedUser>().map(|u| u.id);
        let organization_id = parts.extensions.get::<OrganizationContext>().map(|o| o.0);

        Ok(RequestContext { user_id, organization_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_is_checked_before_organization() {
        let ctx = RequestContext::default();
        assert!(matches!(ctx.require_caller(), Err(AppError::NotAuthenticated)));

        let ctx = RequestContext::new(Some(Uuid::new_v4()), None);
        assert!(matches!(ctx.require_caller(), Err(AppError::NoOrganizationSelected)));

        let user = Uuid::new_v4();
        let org = Uuid::new_v4();
        let caller = RequestContext::new(Some(user), Some(org)).require_caller().unwrap();
        assert_eq!(caller.scope(), Scope::organization(user, org));
    }
}
