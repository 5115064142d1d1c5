// src/middleware/organization.rs

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState, middleware::auth::AuthenticatedUser};

// O nome do nosso cabeçalho HTTP customizado
pub const ORGANIZATION_ID_HEADER: &str = "x-organization-id";

/// Organização ativa da requisição, já conferida contra os vínculos do usuário.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganizationContext(pub Uuid);

/// Aceita o `x-organization-id` só se o usuário for membro.
/// Sem o header a requisição segue sem organização (listar/criar organizações, planos).
pub async fn organization_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(value) = request.headers().get(ORGANIZATION_ID_HEADER) else {
        return Ok(next.run(request).await);
    };

    let organization_id = value
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .ok_or_else(|| AppError::InvalidInput("Header x-organization-id is not a valid UUID".into()))?;

    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .copied()
        .ok_or(AppError::NotAuthenticated)?;

    let membership = app_state
        .organization_service
        .membership(user.id, organization_id)
        .await?;
    if membership.is_none() {
        tracing::warn!("Usuário {} tentou acessar a organização {}", user.id, organization_id);
        return Err(AppError::NotOrganizationMember);
    }

    request.extensions_mut().insert(OrganizationContext(organization_id));
    Ok(next.run(request).await)
}
