// src/models/delegation.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::expenses::default_true;

/// Um usuário (delegator) autoriza outro (delegate) a agir por ele.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Delegation {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    pub delegator_id: Uuid,
    pub delegate_id: Uuid,
    #[serde(default)]
    pub can_submit: bool,
    #[serde(default)]
    pub can_approve: bool,
    pub starts_on: NaiveDate,
    #[serde(default)]
    pub ends_on: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Delegation {
    /// Vale na data informada (ativa e dentro do período).
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.is_active && self.starts_on <= date && self.ends_on.is_none_or(|end| date <= end)
    }
}
