// src/models/receipts.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::status::{DisplayStatus, StatusColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OcrStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DisplayStatus for OcrStatus {
    const ALL: &'static [Self] =
        &[OcrStatus::Pending, OcrStatus::Processing, OcrStatus::Completed, OcrStatus::Failed];

    fn as_str(&self) -> &'static str {
        match self {
            OcrStatus::Pending => "pending",
            OcrStatus::Processing => "processing",
            OcrStatus::Completed => "completed",
            OcrStatus::Failed => "failed",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            OcrStatus::Pending => "Queued",
            OcrStatus::Processing => "Scanning",
            OcrStatus::Completed => "Scanned",
            OcrStatus::Failed => "Scan Failed",
        }
    }

    fn color(&self) -> StatusColor {
        match self {
            OcrStatus::Pending => StatusColor::Gray,
            OcrStatus::Processing => StatusColor::Blue,
            OcrStatus::Completed => StatusColor::Green,
            OcrStatus::Failed => StatusColor::Red,
        }
    }
}

/// Metadados de um comprovante já enviado ao storage.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Receipt {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub expense_id: Option<Uuid>,

    #[schema(example = "receipts/2026/03/abc.jpg")]
    pub storage_path: String,
    #[schema(example = "taxi.jpg")]
    pub file_name: String,
    #[schema(example = "image/jpeg")]
    pub mime_type: String,
    #[schema(example = 183422)]
    pub file_size: i64,

    pub ocr_status: OcrStatus,
    /// Campos extraídos pelo OCR (comerciante, total, data...)
    #[serde(default)]
    pub ocr_data: Option<Value>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
