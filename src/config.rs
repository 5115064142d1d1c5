// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use sqlx::postgres::PgPoolOptions;

use crate::{
    common::i18n::I18nStore,
    gateway::{Gateway, PgGateway},
    services::{
        approval_service::ApprovalService, currency_service::CurrencyService,
        delegation_service::DelegationService, document_service::DocumentService,
        expense_service::ExpenseService, organization_service::OrganizationService,
        per_diem_service::PerDiemService, policy_service::PolicyService,
        receipt_service::ReceiptService, report_service::ReportService,
        subscription_service::SubscriptionService, tax_service::TaxService,
        vendor_service::VendorService,
    },
};

/// Variáveis de ambiente da aplicação.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_address: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub pdf_font_dir: String,
    pub pdf_font_family: String,
}

impl AppConfig {
    /// Lê do ambiente (e do `.env`, se existir).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{} deve ser definida", key))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let max_connections = or_default("DATABASE_MAX_CONNECTIONS", "5")
            .parse()
            .context("DATABASE_MAX_CONNECTIONS precisa ser um número")?;
        let acquire_timeout_secs = or_default("DATABASE_ACQUIRE_TIMEOUT_SECS", "3")
            .parse()
            .context("DATABASE_ACQUIRE_TIMEOUT_SECS precisa ser um número")?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_address: or_default("BIND_ADDRESS", "0.0.0.0:3000"),
            max_connections,
            acquire_timeout_secs,
            pdf_font_dir: or_default("PDF_FONT_DIR", "./fonts"),
            pdf_font_family: or_default("PDF_FONT_FAMILY", "Roboto"),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub jwt_secret: String,
    pub i18n_store: I18nStore,

    pub expense_service: ExpenseService,
    pub report_service: ReportService,
    pub approval_service: ApprovalService,
    pub policy_service: PolicyService,
    pub currency_service: CurrencyService,
    pub tax_service: TaxService,
    pub vendor_service: VendorService,
    pub delegation_service: DelegationService,
    pub per_diem_service: PerDiemService,
    pub receipt_service: ReceiptService,
    pub organization_service: OrganizationService,
    pub subscription_service: SubscriptionService,
    pub document_service: DocumentService,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::with_gateway(Arc::new(PgGateway::new(db_pool)), config))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_gateway(gateway: Arc<dyn Gateway>, config: &AppConfig) -> Self {
        let approval_service = ApprovalService::new(gateway.clone());
        let report_service = ReportService::new(gateway.clone(), approval_service.clone());
        let organization_service = OrganizationService::new(gateway.clone());
        let document_service = DocumentService::new(
            report_service.clone(),
            organization_service.clone(),
            &config.pdf_font_dir,
            &config.pdf_font_family,
        );

        Self {
            jwt_secret: config.jwt_secret.clone(),
            i18n_store: I18nStore::new(),
            expense_service: ExpenseService::new(gateway.clone(), approval_service.clone()),
            report_service,
            approval_service,
            policy_service: PolicyService::new(gateway.clone()),
            currency_service: CurrencyService::new(gateway.clone()),
            tax_service: TaxService::new(gateway.clone()),
            vendor_service: VendorService::new(gateway.clone()),
            delegation_service: DelegationService::new(gateway.clone()),
            per_diem_service: PerDiemService::new(gateway.clone()),
            receipt_service: ReceiptService::new(gateway.clone()),
            organization_service,
            subscription_service: SubscriptionService::new(gateway),
            document_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/expenses"),
            ("JWT_SECRET", "segredo"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.acquire_timeout_secs, 3);
        assert_eq!(config.pdf_font_dir, "./fonts");
        assert_eq!(config.pdf_font_family, "Roboto");
    }

    #[test]
    fn required_keys_are_enforced() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "segredo")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/expenses"),
            ("JWT_SECRET", "  "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn numbers_must_parse() {
        let result = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/expenses"),
            ("JWT_SECRET", "segredo"),
            ("DATABASE_MAX_CONNECTIONS", "muitas"),
        ]));
        assert!(result.is_err());
    }
}
