// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "en";

/// Mensagens dos erros locais, por idioma e código.
/// Erros do gateway não passam por aqui: a mensagem do backend vai como veio.
#[derive(Debug, Clone)]
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

const EN: &[(&str, &str)] = &[
    ("not_authenticated", "User not authenticated"),
    ("no_organization", "No organization selected"),
    ("not_member", "You are not a member of this organization."),
    ("invalid_token", "Invalid or missing authentication token."),
    ("validation", "One or more fields are invalid."),
    ("not_found", "Resource not found."),
    ("font_not_found", "PDF fonts are not available on the server."),
    ("internal", "An unexpected error occurred."),
    ("gateway_unavailable", "The data service is temporarily unavailable."),
];

const PT: &[(&str, &str)] = &[
    ("not_authenticated", "Usuário não autenticado"),
    ("no_organization", "Nenhuma organização selecionada"),
    ("not_member", "Você não é membro desta organização."),
    ("invalid_token", "Token de autenticação inválido ou ausente."),
    ("validation", "Um ou mais campos são inválidos."),
    ("not_found", "Recurso não encontrado."),
    ("font_not_found", "As fontes do PDF não estão disponíveis no servidor."),
    ("internal", "Ocorreu um erro inesperado."),
    ("gateway_unavailable", "O serviço de dados está temporariamente indisponível."),
];

impl I18nStore {
    pub fn new() -> Self {
        let messages = [("en", EN), ("pt", PT)]
            .into_iter()
            .map(|(lang, table)| (lang, table.iter().copied().collect()))
            .collect();
        Self { messages }
    }

    /// Busca no idioma pedido e cai para o inglês.
    pub fn translate(&self, lang: &str, code: &str) -> Option<&'static str> {
        let lookup = |l: &str| self.messages.get(l).and_then(|table| table.get(code)).copied();
        lookup(lang).or_else(|| lookup(DEFAULT_LANG))
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_english() {
        let store = I18nStore::new();
        assert_eq!(store.translate("pt", "no_organization"), Some("Nenhuma organização selecionada"));
        assert_eq!(store.translate("de", "no_organization"), Some("No organization selected"));
        assert_eq!(store.translate("en", "unknown_code"), None);
    }
}
