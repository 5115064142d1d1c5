// src/services/vendor_service.rs

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        context::{Caller, RequestContext},
        error::{AppError, GatewayResultExt},
    },
    gateway::{decode, decode_rows, Direction, Filter, Gateway, TableQuery},
    models::vendors::Vendor,
};

const COMPONENT: &str = "VendorService";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct VendorInput {
    #[validate(length(min = 1, max = 200, message = "O nome é obrigatório."))]
    #[schema(example = "Hotel Ibis Paulista")]
    pub name: String,
    pub tax_id: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub default_category_id: Option<Uuid>,
}

impl VendorInput {
    fn to_row(&self) -> Value {
        json!({
            "name": self.name.trim(),
            "tax_id": self.tax_id,
            "email": self.email,
            "phone": self.phone,
            "address": self.address,
            "default_category_id": self.default_category_id,
        })
    }
}

#[derive(Clone)]
pub struct VendorService {
    gateway: Arc<dyn Gateway>,
}

impl VendorService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Só os ativos; `search` filtra pelo nome (contém, sem diferenciar maiúsculas).
    pub async fn list(
        &self,
        ctx: &RequestContext,
        search: Option<&str>,
    ) -> Result<Vec<Vendor>, AppError> {
        let caller = ctx.require_caller()?;
        let mut query = TableQuery::new("vendors")
            .eq_id("organization_id", caller.organization_id)
            .eq("is_active", true)
            .order("name", Direction::Asc);

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            // `%` e `_` do usuário são literais
            let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
            query = query.filter(Filter::ILike("name", format!("%{}%", escaped)));
        }

        let rows = self.gateway.select(&caller.scope(), query).await.logged(COMPONENT, "list")?;
        decode_rows(rows).logged(COMPONENT, "list")
    }

    pub async fn get(&self, ctx: &RequestContext, vendor_id: Uuid) -> Result<Vendor, AppError> {
        let caller = ctx.require_caller()?;
        let query = TableQuery::new("vendors")
            .eq_id("id", vendor_id)
            .eq_id("organization_id", caller.organization_id);
        self.gateway
            .select_one(&caller.scope(), query)
            .await
            .and_then(decode)
            .logged(COMPONENT, "get")
    }

    pub async fn create(&self, ctx: &RequestContext, input: VendorInput) -> Result<Vendor, AppError> {
        let caller = ctx.require_caller()?;
        let mut row = input.to_row();
        row["organization_id"] = json!(caller.organization_id);
        row["is_active"] = json!(true);

        self.gateway
            .insert(&caller.scope(), "vendors", row)
            .await
            .and_then(decode)
            .logged(COMPONENT, "create")
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        vendor_id: Uuid,
        input: VendorInput,
    ) -> Result<Vendor, AppError> {
        let caller = ctx.require_caller()?;
        self.patch(&caller, vendor_id, input.to_row(), "update").await
    }

    /// Fornecedores não são apagados: despesas antigas continuam apontando para eles.
    pub async fn deactivate(&self, ctx: &RequestContext, vendor_id: Uuid) -> Result<Vendor, AppError> {
        let caller = ctx.require_caller()?;
        self.patch(&caller, vendor_id, json!({ "is_active": false }), "deactivate").await
    }

    async fn patch(
        &self,
        caller: &Caller,
        vendor_id: Uuid,
        patch: Value,
        operation: &'static str,
    ) -> Result<Vendor, AppError> {
        let filters = vec![
            Filter::id("id", vendor_id),
            Filter::id("organization_id", caller.organization_id),
        ];
        let mut rows = self
            .gateway
            .update(&caller.scope(), "vendors", filters, patch)
            .await
            .logged(COMPONENT, operation)?;
        let row = rows.pop().ok_or(AppError::NotFound("Vendor"))?;
        decode(row).logged(COMPONENT, operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryGateway;

    fn vendor_row(org: Uuid, name: &str, active: bool) -> Value {
        json!({ "id": Uuid::new_v4(), "organization_id": org, "name": name, "is_active": active })
    }

    #[tokio::test]
    async fn search_matches_name_and_skips_inactive() {
        let gw = Arc::new(MemoryGateway::new());
        let ctx = RequestContext::new(Some(Uuid::new_v4()), Some(Uuid::new_v4()));
        let org = ctx.organization_id.unwrap();
        gw.seed(
            "vendors",
            vec![
                vendor_row(org, "Hotel Ibis", true),
                vendor_row(org, "Hotel Antigo", false),
                vendor_row(org, "Uber", true),
            ],
        );
        let service = VendorService::new(gw.clone());

        let found = service.list(&ctx, Some("hotel")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Hotel Ibis");

        let query = &gw.selects_on("vendors")[0];
        assert!(query.filters.contains(&Filter::ILike("name", "%hotel%".into())));
    }

    #[tokio::test]
    async fn deactivating_unknown_vendor_is_not_found() {
        let gw = Arc::new(MemoryGateway::new());
        let ctx = RequestContext::new(Some(Uuid::new_v4()), Some(Uuid::new_v4()));
        let service = VendorService::new(gw);

        let err = service.deactivate(&ctx, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("Vendor")));
    }
}
