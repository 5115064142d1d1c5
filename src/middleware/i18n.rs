// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::common::i18n::DEFAULT_LANG;

/// Idioma preferido do cliente (só a parte primária: "pt-BR" -> "pt").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let lang = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .and_then(|header_str| {
                accept_language::parse(header_str).first().map(|tag| {
                    tag.split('-').next().unwrap_or(tag).to_lowercase()
                })
            })
            .unwrap_or_else(|| DEFAULT_LANG.to_string());

        Ok(Locale(lang))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn locale_of(header: Option<&str>) -> String {
        let mut builder = Request::builder();
        if let Some(value) = header {
            builder = builder.header(header::ACCEPT_LANGUAGE, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Locale::from_request_parts(&mut parts, &()).await.unwrap().0
    }

    #[tokio::test]
    async fn primary_tag_wins() {
        assert_eq!(locale_of(Some("pt-BR,pt;q=0.9,en;q=0.8")).await, "pt");
        assert_eq!(locale_of(Some("en-US")).await, "en");
    }

    #[tokio::test]
    async fn falls_back_to_default() {
        assert_eq!(locale_of(None).await, DEFAULT_LANG);
    }
}
