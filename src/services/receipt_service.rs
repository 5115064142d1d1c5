// src/services/receipt_service.rs

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        context::RequestContext,
        error::{AppError, GatewayResultExt},
    },
    gateway::{decode, decode_rows, Direction, Filter, Gateway, TableQuery},
    models::receipts::{OcrStatus, Receipt},
};

const COMPONENT: &str = "ReceiptService";

/// Tamanho máximo aceito para um comprovante (10 MB).
pub const MAX_RECEIPT_BYTES: i64 = 10 * 1024 * 1024;

const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/heic", "application/pdf"];

/// O arquivo já foi enviado ao storage; aqui só registramos os metadados.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewReceipt {
    #[validate(length(min = 1, max = 500))]
    #[schema(example = "receipts/2026/03/abc.jpg")]
    pub storage_path: String,
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "taxi.jpg")]
    pub file_name: String,
    #[schema(example = "image/jpeg")]
    pub mime_type: String,
    #[schema(example = 183422)]
    pub file_size: i64,
    pub expense_id: Option<Uuid>,
}

impl NewReceipt {
    fn check_file(&self) -> Result<(), AppError> {
        if !ACCEPTED_MIME_TYPES.contains(&self.mime_type.as_str()) {
            return Err(AppError::InvalidInput(format!(
                "Unsupported receipt type: {}",
                self.mime_type
            )));
        }
        if self.file_size <= 0 || self.file_size > MAX_RECEIPT_BYTES {
            return Err(AppError::InvalidInput("Receipt must be between 1 byte and 10 MB".into()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct ReceiptService {
    gateway: Arc<dyn Gateway>,
}

impl ReceiptService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn register(&self, ctx: &RequestContext, input: NewReceipt) -> Result<Receipt, AppError> {
        let caller = ctx.require_caller()?;
        input.check_file()?;

        let row = json!({
            "organization_id": caller.organization_id,
            "user_id": caller.user_id,
            "expense_id": input.expense_id,
            "storage_path": input.storage_path,
            "file_name": input.file_name,
            "mime_type": input.mime_type,
            "file_size": input.file_size,
            "ocr_status": OcrStatus::Pending,
        });
        self.gateway
            .insert(&caller.scope(), "receipts", row)
            .await
            .and_then(decode)
            .logged(COMPONENT, "register")
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        expense_id: Option<Uuid>,
    ) -> Result<Vec<Receipt>, AppError> {
        let caller = ctx.require_caller()?;
        let mut query = TableQuery::new("receipts")
            .eq_id("organization_id", caller.organization_id)
            .order("created_at", Direction::Desc);
        if let Some(expense_id) = expense_id {
            query = query.eq_id("expense_id", expense_id);
        }

        let rows = self.gateway.select(&caller.scope(), query).await.logged(COMPONENT, "list")?;
        decode_rows(rows).logged(COMPONENT, "list")
    }

    /// Vincula o comprovante à despesa (dos dois lados).
    pub async fn attach(
        &self,
        ctx: &RequestContext,
        receipt_id: Uuid,
        expense_id: Uuid,
    ) -> Result<Receipt, AppError> {
        let caller = ctx.require_caller()?;
        let scope = caller.scope();

        let filters = vec![
            Filter::id("id", receipt_id),
            Filter::id("organization_id", caller.organization_id),
        ];
        let mut rows = self
            .gateway
            .update(&scope, "receipts", filters, json!({ "expense_id": expense_id }))
            .await
            .logged(COMPONENT, "attach")?;
        let row = rows.pop().ok_or(AppError::NotFound("Receipt"))?;

        let expense_filters = vec![
            Filter::id("id", expense_id),
            Filter::id("organization_id", caller.organization_id),
        ];
        let updated = self
            .gateway
            .update(&scope, "expenses", expense_filters, json!({ "receipt_id": receipt_id }))
            .await
            .logged(COMPONENT, "attach")?;
        if updated.is_empty() {
            return Err(AppError::NotFound("Expense"));
        }

        decode(row).logged(COMPONENT, "attach")
    }

    /// Enfileira o OCR. O processamento em si é do backend.
    pub async fn request_ocr(
        &self,
        ctx: &RequestContext,
        receipt_id: Uuid,
    ) -> Result<Receipt, AppError> {
        let caller = ctx.require_caller()?;
        let payload = self
            .gateway
            .rpc(&caller.scope(), "process_receipt_ocr", json!({ "p_receipt_id": receipt_id }))
            .await
            .logged(COMPONENT, "request_ocr")?;

        match payload {
            Value::Object(_) => decode(payload).logged(COMPONENT, "request_ocr"),
            _ => {
                let query = TableQuery::new("receipts")
                    .eq_id("id", receipt_id)
                    .eq_id("organization_id", caller.organization_id);
                self.gateway
                    .select_one(&caller.scope(), query)
                    .await
                    .and_then(decode)
                    .logged(COMPONENT, "request_ocr")
            }
        }
    }
}
