// src/models/vendors.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::expenses::default_true;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Vendor {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,

    #[schema(example = "Hotel Ibis Paulista")]
    pub name: String,
    #[schema(example = "12.345.678/0001-90")]
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub default_category_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}
