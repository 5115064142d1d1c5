// src/common/error.rs

use std::{collections::HashMap, sync::LazyLock};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    common::i18n::{I18nStore, DEFAULT_LANG},
    gateway::GatewayError,
    middleware::i18n::Locale,
    services::expense_service::SplitValidationError,
};

static DEFAULT_I18N: LazyLock<I18nStore> = LazyLock::new(I18nStore::new);

// Nosso tipo de erro da camada de serviço.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Pré-condições (nunca chegam a fazer chamada de rede) ---
    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("No organization selected")]
    NoOrganizationSelected,

    #[error("Not a member of this organization")]
    NotOrganizationMember,

    #[error("Invalid token")]
    InvalidToken,

    // --- Validação ---
    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    InvalidSplit(#[from] SplitValidationError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidState(String),

    // A mensagem do backend passa direto
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),
}

/// Erro já pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotAuthenticated => "not_authenticated",
            AppError::NoOrganizationSelected => "no_organization",
            AppError::NotOrganizationMember => "not_member",
            AppError::InvalidToken => "invalid_token",
            AppError::ValidationError(_) => "validation",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::InvalidSplit(_) => "invalid_split",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidState(_) => "invalid_state",
            AppError::Gateway(_) => "gateway",
            AppError::FontNotFound(_) => "font_not_found",
            AppError::InternalServerError(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotAuthenticated | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::NotOrganizationMember => StatusCode::FORBIDDEN,
            AppError::NoOrganizationSelected
            | AppError::ValidationError(_)
            | AppError::InvalidInput(_)
            | AppError::InvalidSplit(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::Gateway(e) => gateway_status(e),
            AppError::FontNotFound(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Converte para a resposta HTTP, traduzindo as mensagens locais pelo idioma do cliente.
    pub fn to_api_error(self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status();
        let translated = |code: &str, fallback: String| {
            i18n.translate(&locale.0, code).map(str::to_string).unwrap_or(fallback)
        };

        match self {
            // Sugestão B: Retornar todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                ApiError {
                    status,
                    error: translated("validation", "One or more fields are invalid.".into()),
                    details: Some(json!(details)),
                }
            }
            AppError::NotFound(entity) => ApiError {
                status,
                error: translated("not_found", format!("{} not found", entity)),
                details: Some(json!({ "entity": entity })),
            },
            AppError::InvalidInput(message) | AppError::InvalidState(message) => {
                ApiError { status, error: message, details: None }
            }
            AppError::InvalidSplit(e) => ApiError { status, error: e.to_string(), details: None },
            AppError::Gateway(GatewayError::Transport(ref message)) => {
                tracing::error!("Gateway indisponível: {}", message);
                ApiError {
                    status,
                    error: translated("gateway_unavailable", "Service unavailable".into()),
                    details: None,
                }
            }
            AppError::Gateway(e) => ApiError {
                status,
                error: e.to_string(),
                details: e.code().map(|code| json!({ "code": code })),
            },
            // Os outros erros internos: o detalhe fica só no log
            ref e @ (AppError::FontNotFound(_) | AppError::InternalServerError(_)) => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                ApiError { status, error: translated(e.code(), e.to_string()), details: None }
            }
            other => {
                let code = other.code();
                ApiError { status, error: translated(code, other.to_string()), details: None }
            }
        }
    }
}

fn gateway_status(error: &GatewayError) -> StatusCode {
    match error {
        GatewayError::RowNotVisible => StatusCode::NOT_FOUND,
        GatewayError::Rejected { code, .. } => match code.as_deref() {
            Some("42501") => StatusCode::FORBIDDEN,          // insufficient_privilege / RLS
            Some("23505") => StatusCode::CONFLICT,           // unique_violation
            Some("23503") | Some("23514") | Some("22P02") => StatusCode::BAD_REQUEST,
            Some("P0001") => StatusCode::UNPROCESSABLE_ENTITY, // RAISE EXCEPTION da procedure
            _ => StatusCode::BAD_GATEWAY,
        },
        GatewayError::InvalidArgument { .. } | GatewayError::InvalidIdentifier(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        GatewayError::UnknownProcedure(_) | GatewayError::Decode(_) => StatusCode::BAD_GATEWAY,
        GatewayError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

// Usado pelos middlewares, que não têm o Locale em mãos.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale(DEFAULT_LANG.to_string()), &DEFAULT_I18N)
            .into_response()
    }
}

// =========================================================================
//  LOG DOS ERROS DO GATEWAY
// =========================================================================

pub trait GatewayResultExt<T> {
    /// Loga a falha com a tag do componente e devolve o erro sem mexer na mensagem.
    fn logged(self, component: &'static str, operation: &'static str) -> Result<T, AppError>;
}

impl<T> GatewayResultExt<T> for Result<T, GatewayError> {
    fn logged(self, component: &'static str, operation: &'static str) -> Result<T, AppError> {
        self.map_err(|e| {
            tracing::error!(
                component,
                operation,
                code = e.code().unwrap_or("-"),
                "Falha no gateway: {}",
                e
            );
            AppError::Gateway(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locale(lang: &str) -> Locale {
        Locale(lang.to_string())
    }

    #[test]
    fn precondition_errors_are_localized() {
        let store = I18nStore::new();

        let en = AppError::NoOrganizationSelected.to_api_error(&locale("en"), &store);
        assert_eq!(en.status, StatusCode::BAD_REQUEST);
        assert_eq!(en.error, "No organization selected");

        let pt = AppError::NotAuthenticated.to_api_error(&locale("pt"), &store);
        assert_eq!(pt.status, StatusCode::UNAUTHORIZED);
        assert_eq!(pt.error, "Usuário não autenticado");
    }

    #[test]
    fn gateway_messages_pass_through_verbatim() {
        let store = I18nStore::new();
        let err = AppError::Gateway(GatewayError::Rejected {
            code: Some("P0001".into()),
            message: "Approver is not assigned to the current step".into(),
        });

        let api = err.to_api_error(&locale("pt"), &store);
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api.error, "Approver is not assigned to the current step");
        assert_eq!(api.details, Some(json!({ "code": "P0001" })));
    }

    #[test]
    fn logged_keeps_the_gateway_error() {
        let result: Result<(), GatewayError> = Err(GatewayError::RowNotVisible);
        let err = result.logged("tests", "logged").unwrap_err();
        assert!(matches!(err, AppError::Gateway(GatewayError::RowNotVisible)));
        assert_eq!(err.to_string(), "Row not visible after the operation");
    }
}
