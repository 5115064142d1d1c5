// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState};

/// Claims do token emitido pelo backend hospedado.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

/// Usuário da sessão, colocado nas extensions da requisição.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
}

pub fn validate_token(token: &str, secret: &str) -> Result<AuthenticatedUser, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Token rejeitado: {}", e);
        AppError::InvalidToken
    })?;

    Ok(AuthenticatedUser { id: token_data.claims.sub })
}

// Sem header = sessão anônima; o serviço decide se precisa de usuário.
// Header presente e inválido = 401 na hora.
pub async fn session_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Qualquer esquema que não seja Bearer conta como token inválido
    let bearer = request
        .headers()
        .typed_try_get::<Authorization<Bearer>>()
        .map_err(|_| AppError::InvalidToken)?;

    if let Some(bearer) = bearer {
        let user = validate_token(bearer.token(), &app_state.jwt_secret)?;
        request.extensions_mut().insert(user);
    }

    Ok(next.run(request).await)
}

// Extrator para os handlers que exigem sessão
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or(AppError::NotAuthenticated)
    }
}

#[cfg(test)]
pub(crate) fn issue_test_token(user_id: Uuid, secret: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id,
        exp: (now + chrono::Duration::hours(1)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref())).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_tokens_signed_with_the_secret() {
        let user = Uuid::new_v4();
        let token = issue_test_token(user, "segredo");
        assert_eq!(validate_token(&token, "segredo").unwrap().id, user);
    }

    #[test]
    fn rejects_foreign_or_garbage_tokens() {
        let token = issue_test_token(Uuid::new_v4(), "outro");
        assert!(matches!(validate_token(&token, "segredo"), Err(AppError::InvalidToken)));
        assert!(matches!(validate_token("abc.def", "segredo"), Err(AppError::InvalidToken)));
    }
}
